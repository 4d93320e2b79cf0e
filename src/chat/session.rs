use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::sync::Arc;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, info, warn};

use crate::chat::connection::{write_outbound, Connection, CLOSE_GRACE};
use crate::chat::protocol::{Command, ServerMessage};
use crate::chat::registry::{Participant, Registry};
use crate::config::ChatSettings;
use crate::error::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Handshaking,
    Active,
    Terminated,
}

type Lines<S> = FramedRead<ReadHalf<S>, LinesCodec>;

/// Drives one connection from greeting to cleanup.
pub struct Session {
    registry: Arc<Registry>,
    settings: Arc<ChatSettings>,
    peer: Option<SocketAddr>,
    state: SessionState,
}

impl Session {
    pub fn new(registry: Arc<Registry>, settings: Arc<ChatSettings>, peer: Option<SocketAddr>) -> Self {
        Self {
            registry,
            settings,
            peer,
            state: SessionState::Connecting,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {:?}: {:?} -> {:?}", self.peer, self.state, next);
        self.state = next;
    }

    /// Run the session to completion over `stream`.
    ///
    /// Whatever ends the active loop (`/quit`, end of stream, a read error or
    /// the connection being closed by a kick), the participant is removed from
    /// the registry and the rest of the roster hears that they left. An error
    /// is returned only for transport or framing failures.
    pub async fn run<S>(mut self, stream: S) -> Result<(), ChatError>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let (connection, outbound) = Connection::new(self.settings.outbound_queue);
        let mut writer_task = tokio::spawn(write_outbound(writer, outbound, connection.closer()));
        let mut lines = FramedRead::new(
            reader,
            LinesCodec::new_with_max_length(self.settings.max_line_length),
        );

        let result = self.serve(&connection, &mut lines).await;

        self.transition(SessionState::Terminated);
        connection.close();
        match timeout(CLOSE_GRACE * 2, &mut writer_task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Writer task for {} failed: {}", connection.id(), e),
            Err(_) => {
                warn!("Writer task for {} did not stop, aborting it", connection.id());
                writer_task.abort();
            }
        }
        result
    }

    async fn serve<S>(&mut self, connection: &Connection, lines: &mut Lines<S>) -> Result<(), ChatError>
    where
        S: AsyncRead,
    {
        connection.send(&ServerMessage::Welcome.to_string())?;
        connection.send(&ServerMessage::NicknamePrompt.to_string())?;
        self.transition(SessionState::Handshaking);

        let nickname = match Self::next_line(connection, lines).await? {
            Some(line) => self.nickname_from(&line),
            None => {
                debug!("Connection {} closed before choosing a nickname", connection.id());
                return Ok(());
            }
        };

        let participant = Participant::new(connection.clone(), nickname);
        self.registry.add(participant.clone()).await;
        self.registry
            .broadcast(&ServerMessage::Joined(participant.nickname().to_string()).to_string(), Some(participant.id()))
            .await;
        info!("Client {} connected from {:?}", participant.nickname(), self.peer);
        self.transition(SessionState::Active);

        let result = self.active(&participant, lines).await;

        self.registry.remove(participant.id()).await;
        self.registry
            .broadcast(&ServerMessage::Left(participant.nickname().to_string()).to_string(), Some(participant.id()))
            .await;
        info!("Client {} disconnected", participant.nickname());

        result
    }

    async fn active<S>(&self, participant: &Participant, lines: &mut Lines<S>) -> Result<(), ChatError>
    where
        S: AsyncRead,
    {
        while let Some(line) = Self::next_line(participant.connection(), lines).await? {
            let Some(command) = Command::parse(&line) else {
                continue;
            };
            if self.dispatch(participant, command).await.is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Next inbound line, or `None` at end of stream or once the connection
    /// has been closed from elsewhere.
    async fn next_line<S>(connection: &Connection, lines: &mut Lines<S>) -> Result<Option<String>, ChatError>
    where
        S: AsyncRead,
    {
        tokio::select! {
            _ = connection.closed() => Ok(None),
            line = lines.next() => line.transpose().map_err(ChatError::from),
        }
    }

    fn nickname_from(&self, line: &str) -> String {
        let nickname = line.trim();
        if nickname.is_empty() {
            self.settings.default_nickname.clone()
        } else {
            nickname.to_string()
        }
    }

    async fn dispatch(&self, participant: &Participant, command: Command) -> ControlFlow<()> {
        match command {
            Command::Quit => return ControlFlow::Break(()),
            Command::List => {
                let names = self
                    .registry
                    .snapshot()
                    .await
                    .iter()
                    .map(|p| p.nickname().to_string())
                    .collect();
                self.reply(participant, ServerMessage::Roster(names));
            }
            Command::Time => {
                self.reply(participant, ServerMessage::server_time(chrono::Local::now()));
            }
            Command::Kick { target: None } => {
                self.reply(participant, ServerMessage::KickUsage);
            }
            Command::Kick { target: Some(target) } => {
                self.kick(participant, target).await;
            }
            Command::Chat(text) => {
                let message = ServerMessage::Chat {
                    from: participant.nickname().to_string(),
                    text,
                };
                self.registry.broadcast(&message.to_string(), Some(participant.id())).await;
            }
        }
        ControlFlow::Continue(())
    }

    async fn kick(&self, kicker: &Participant, target: String) {
        match self.registry.kick(&target).await {
            Some(victim) => {
                info!("{} kicked {}", kicker.nickname(), victim.nickname());
                self.reply(kicker, ServerMessage::YouKicked(target.clone()));
                let notice = ServerMessage::WasKicked {
                    target,
                    by: kicker.nickname().to_string(),
                };
                self.registry.broadcast(&notice.to_string(), None).await;
            }
            None => self.reply(kicker, ServerMessage::NoSuchUser(target)),
        }
    }

    fn reply(&self, participant: &Participant, message: ServerMessage) {
        if let Err(e) = participant.connection().send(&message.to_string()) {
            warn!("Failed to reply to {}: {}", participant.nickname(), e);
        }
    }
}
