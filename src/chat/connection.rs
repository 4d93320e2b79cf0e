use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::timeout;
use tokio_util::codec::{FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use crate::error::ChatError;

/// How long a closed connection may spend flushing queued lines before the
/// write half is dropped regardless.
pub const CLOSE_GRACE: Duration = Duration::from_millis(500);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one accepted connection. Ids are handed out in accept order,
/// so ordering by id is ordering by arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outbound handle for a connection.
///
/// Cloning is cheap; every clone feeds the same bounded queue, which a
/// dedicated writer task (see [`write_outbound`]) drains to the socket.
/// Closing the handle releases both the writer task and any session blocked
/// on a read.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::Sender<String>,
    closer: CancellationToken,
}

impl Connection {
    pub fn new(queue_capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let connection = Self {
            id: ConnectionId::next(),
            tx,
            closer: CancellationToken::new(),
        };
        (connection, rx)
    }

    /// Queue one message for delivery. Embedded newlines are written as-is and
    /// arrive at the client as separate lines.
    ///
    /// Never waits. A peer that lets its queue fill up is too slow to keep:
    /// the connection is closed and the send reported as failed.
    pub fn send(&self, msg: &str) -> Result<(), ChatError> {
        if self.closer.is_cancelled() {
            return Err(ChatError::SendError(format!("connection {} is closed", self.id)));
        }
        match self.tx.try_send(msg.to_string()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.close();
                Err(ChatError::SendError(format!(
                    "connection {} outbound queue is full, closing it",
                    self.id
                )))
            }
            Err(TrySendError::Closed(_)) => Err(ChatError::SendError(format!(
                "connection {} writer has stopped",
                self.id
            ))),
        }
    }

    /// Signal the connection to shut down. Never blocks; the socket teardown
    /// happens on the writer task.
    pub fn close(&self) {
        self.closer.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closer.is_cancelled()
    }

    pub async fn closed(&self) {
        self.closer.cancelled().await
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn closer(&self) -> CancellationToken {
        self.closer.clone()
    }
}

/// Drain queued lines to `writer` until the connection is closed or every
/// handle is dropped, then shut the write half down.
///
/// A write stuck on a peer that stopped reading is abandoned as soon as the
/// connection is closed. Lines still queued at that point get [`CLOSE_GRACE`]
/// to reach the socket before the write half is dropped.
pub async fn write_outbound<W>(
    writer: W,
    mut rx: mpsc::Receiver<String>,
    closer: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    loop {
        let line = tokio::select! {
            biased;
            message = rx.recv() => match message {
                Some(line) => line,
                None => break,
            },
            _ = closer.cancelled() => break,
        };

        tokio::select! {
            biased;
            result = sink.send(line) => {
                if let Err(e) = result {
                    warn!("Error writing to connection: {}", e);
                    // a dead writer must also end the session reading from this socket
                    closer.cancel();
                    break;
                }
            }
            _ = closer.cancelled() => break,
        }
    }

    rx.close();
    let flush = async {
        while let Ok(line) = rx.try_recv() {
            sink.feed(line).await?;
        }
        SinkExt::<String>::close(&mut sink).await
    };
    match timeout(CLOSE_GRACE, flush).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Error shutting down connection: {}", e),
        Err(_) => debug!("Peer stopped reading, dropping connection without flushing"),
    }
}
