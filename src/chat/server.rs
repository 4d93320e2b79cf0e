use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

use crate::chat::{Registry, Session};
use crate::config::ChatSettings;

/// Accepts connections and runs one [`Session`] per connection, all sharing
/// a single [`Registry`].
pub struct ChatServer {
    registry: Arc<Registry>,
    settings: Arc<ChatSettings>,
}

impl ChatServer {
    pub fn new(settings: ChatSettings) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            settings: Arc::new(settings),
        }
    }

    /// Accept connections forever. Accept errors are logged and the loop
    /// keeps going.
    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        match listener.local_addr() {
            Ok(addr) => info!("Socket server started on {}", addr),
            Err(e) => error!("Socket server started on unknown address: {}", e),
        }

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let server = self.clone();
                    tokio::spawn(async move {
                        server.handle_connection(stream, addr).await;
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    pub async fn handle_connection(self: Arc<Self>, stream: TcpStream, addr: SocketAddr) {
        info!("New connection from: {}", addr);

        let session = Session::new(self.registry.clone(), self.settings.clone(), Some(addr));
        if let Err(e) = session.run(stream).await {
            error!("Session for {} ended with error: {}", addr, e);
        }

        info!("Connection {} closed", addr);
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::time::{sleep, timeout};

    const POLL_INTERVAL: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_connection_tracking() {
        let _ = tracing_subscriber::fmt::try_init();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(ChatServer::new(ChatSettings::default()));
        let registry = server.registry();
        tokio::spawn(server.run(listener));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader).lines();

        let greeting = timeout(Duration::from_secs(5), reader.next_line()).await.unwrap().unwrap();
        assert_eq!(greeting.as_deref(), Some("Welcome to the Go Socket Server!"));

        writer.write_all(b"Dana\n").await.unwrap();
        timeout(Duration::from_secs(5), async {
            while registry.len().await != 1 {
                sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .expect("client never joined");

        drop(writer);
        drop(reader);
        timeout(Duration::from_secs(5), async {
            while !registry.is_empty().await {
                sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .expect("client never left");
    }
}
