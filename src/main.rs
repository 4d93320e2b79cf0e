use std::sync::Arc;
use chat_server::{init_logging, AppError, ChatServer, Settings};
use dotenv::dotenv;
use tokio::net::TcpListener;
use tracing::info;

fn main() -> chat_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    let config = Settings::new()?;
    init_logging(&config.log.level);
    info!("Configuration loaded successfully ({})", config.environment);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers.max(1) as usize)
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))
}

async fn serve(config: Settings) -> chat_server::Result<()> {
    let address = config.server.address();
    info!("Starting socket server at {}", address);

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| AppError::InternalError(format!("failed to start server on {}: {}", address, e)))?;

    let server = Arc::new(ChatServer::new(config.chat));

    tokio::select! {
        _ = server.run(listener) => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received, stopping server");
        }
    }

    Ok(())
}
