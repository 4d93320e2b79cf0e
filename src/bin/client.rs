use chat_server::{client, init_logging, Settings};
use dotenv::dotenv;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Settings::new()?;
    init_logging(&config.log.level);

    client::run(&config.client.address(), BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}
