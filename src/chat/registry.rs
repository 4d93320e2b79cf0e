use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{info, warn};
use crate::chat::connection::{Connection, ConnectionId};
use crate::chat::protocol::ServerMessage;

/// A connected, named chat user.
#[derive(Debug, Clone)]
pub struct Participant {
    connection: Connection,
    nickname: String,
}

impl Participant {
    pub fn new(connection: Connection, nickname: impl Into<String>) -> Self {
        Self {
            connection,
            nickname: nickname.into(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

/// The shared roster of joined participants.
///
/// Mutations (`add`, `remove`, `kick`) take the write lock; `broadcast` and
/// the lookups share the read lock, so broadcasts run alongside each other
/// but never observe a half-applied join, leave or kick. Entries are keyed by
/// connection id, which makes enumeration follow join order.
#[derive(Debug, Default)]
pub struct Registry {
    participants: RwLock<BTreeMap<ConnectionId, Participant>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` without replacing anything if the connection is
    /// already registered.
    pub async fn add(&self, participant: Participant) -> bool {
        let mut participants = self.participants.write().await;
        if participants.contains_key(&participant.id()) {
            warn!("Connection {} is already registered", participant.id());
            return false;
        }
        info!("Added {} ({}) to registry", participant.nickname, participant.id());
        participants.insert(participant.id(), participant);
        true
    }

    /// Removing an absent connection is a no-op, which covers a session
    /// cleaning up after it has already been kicked.
    pub async fn remove(&self, id: ConnectionId) -> Option<Participant> {
        let removed = self.participants.write().await.remove(&id);
        if let Some(participant) = &removed {
            info!("Removed {} ({}) from registry", participant.nickname, id);
        }
        removed
    }

    /// First participant in join order whose nickname matches exactly.
    pub async fn find_by_name(&self, name: &str) -> Option<Participant> {
        let participants = self.participants.read().await;
        first_named(&participants, name).cloned()
    }

    pub async fn snapshot(&self) -> Vec<Participant> {
        self.participants.read().await.values().cloned().collect()
    }

    pub async fn nicknames(&self) -> Vec<String> {
        self.participants
            .read()
            .await
            .values()
            .map(|p| p.nickname.clone())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.participants.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.participants.read().await.is_empty()
    }

    /// Deliver `msg` to every participant except `exclude`. A failed send is
    /// logged and skipped. Returns how many participants the message was
    /// queued for.
    pub async fn broadcast(&self, msg: &str, exclude: Option<ConnectionId>) -> usize {
        let participants = self.participants.read().await;
        let mut delivered = 0;

        for (id, participant) in participants.iter() {
            if exclude == Some(*id) {
                continue;
            }

            match participant.connection.send(msg) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to broadcast to {} ({}): {}", participant.nickname, id, e),
            }
        }

        delivered
    }

    /// Find, notify, unregister and close the first participant named `name`
    /// under a single write lock. The close only signals the victim's own
    /// tasks, so the caller is never held up by the victim's socket teardown.
    pub async fn kick(&self, name: &str) -> Option<Participant> {
        let mut participants = self.participants.write().await;

        let id = first_named(&participants, name).map(Participant::id)?;
        let participant = participants.remove(&id)?;

        if let Err(e) = participant.connection.send(&ServerMessage::Kicked.to_string()) {
            warn!("Failed to notify {} ({}) of kick: {}", participant.nickname, id, e);
        }
        participant.connection.close();

        info!("Kicked {} ({}) from registry", participant.nickname, id);
        Some(participant)
    }
}

fn first_named<'a>(
    participants: &'a BTreeMap<ConnectionId, Participant>,
    name: &str,
) -> Option<&'a Participant> {
    participants.values().find(|p| p.nickname == name)
}
