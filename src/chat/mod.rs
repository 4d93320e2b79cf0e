//! Chat module for the socket server
//!
//! This module holds the participant registry, the per-connection session
//! engine and the listener that ties them together.

mod connection;
mod protocol;
mod registry;
mod server;
mod session;

pub use connection::{write_outbound, Connection, ConnectionId};
pub use protocol::{Command, ServerMessage};
pub use registry::{Participant, Registry};
pub use server::ChatServer;
pub use session::{Session, SessionState};
