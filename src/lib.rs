pub mod chat;
pub mod client;
pub mod config;
pub mod error;

pub use crate::error::{AppError, ChatError};
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::{ChatSettings, Settings};

pub use crate::chat::{ChatServer, Participant, Registry, Session};

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the global tracing subscriber. `RUST_LOG` wins over `level` when
/// it is set.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Global tracing subscriber was already set");
    }
}
