//! Interactive line client for the chat server.

use futures::SinkExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_util::codec::{FramedWrite, LinesCodec};
use tracing::{debug, info};

use crate::error::{AppError, ChatError};
use crate::Result;

/// Connect to `address`, print every server line to stdout and forward each
/// non-empty line of `input` to the server. Returns after `/quit`, at the end
/// of `input`, or once the server closes the connection.
pub async fn run<R>(address: &str, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let stream = TcpStream::connect(address).await.map_err(|e| {
        AppError::Chat(ChatError::ConnectionError(format!(
            "Failed to connect to server at {}: {}",
            address, e
        )))
    })?;

    println!("Connected to server!");
    println!("Commands: /quit (exit), /list (show users), /time (server time), /kick <nickname>");
    println!("Just type messages to chat with others");

    let (reader, writer) = stream.into_split();
    let mut printer = tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            println!("{}", line);
        }
    });

    let mut writer = FramedWrite::new(writer, LinesCodec::new());
    let mut input = input.lines();

    loop {
        tokio::select! {
            _ = &mut printer => {
                info!("Server closed the connection");
                break;
            }
            line = input.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let message = line.trim();
                if message.is_empty() {
                    continue;
                }

                if let Err(e) = writer.send(message).await {
                    println!("Error sending message: {}", e);
                    break;
                }

                if message == "/quit" {
                    break;
                }
            }
        }
    }

    if let Err(e) = SinkExt::<&str>::close(&mut writer).await {
        debug!("Error closing connection: {}", e);
    }
    printer.abort();

    println!("Disconnected from server");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_forwards_trimmed_lines_until_quit() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut lines = BufReader::new(stream).lines();
            let mut received = Vec::new();
            while let Some(line) = lines.next_line().await.unwrap() {
                received.push(line);
            }
            received
        });

        let input: &[u8] = b"Alice\n\n   hi there  \n/quit\nnever sent\n";
        timeout(Duration::from_secs(5), run(&addr, input)).await.unwrap().unwrap();

        let received = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
        assert_eq!(received, vec!["Alice", "hi there", "/quit"]);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let input: &[u8] = b"";
        let result = run(&addr, input).await;
        assert!(matches!(result, Err(AppError::Chat(ChatError::ConnectionError(_)))));
    }
}
