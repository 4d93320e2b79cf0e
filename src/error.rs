use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

// Implement conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

/// Errors scoped to a single chat session. None of these are fatal to the
/// server; they end the session that raised them.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Message sending failed: {0}")]
    SendError(String),

    #[error("Invalid message format: {0}")]
    InvalidFormat(String),
}

impl From<tokio_util::codec::LinesCodecError> for ChatError {
    fn from(err: tokio_util::codec::LinesCodecError) -> Self {
        match err {
            tokio_util::codec::LinesCodecError::MaxLineLengthExceeded => {
                ChatError::InvalidFormat("line exceeds maximum length".to_string())
            }
            tokio_util::codec::LinesCodecError::Io(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                ChatError::InvalidFormat(e.to_string())
            }
            tokio_util::codec::LinesCodecError::Io(e) => ChatError::ConnectionError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tokio_util::codec::LinesCodecError;

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::InternalError(_)));

        let config_err = config::ConfigError::NotFound(String::from("key not found"));
        let app_err: AppError = config_err.into();
        assert!(matches!(app_err, AppError::ConfigError(_)));

        let chat_err = ChatError::SendError("closed".to_string());
        let app_err: AppError = chat_err.into();
        assert!(matches!(app_err, AppError::Chat(ChatError::SendError(_))));
    }

    #[test]
    fn test_codec_error_conversion() {
        let err: ChatError = LinesCodecError::MaxLineLengthExceeded.into();
        assert!(matches!(err, ChatError::InvalidFormat(_)));

        let err: ChatError = LinesCodecError::Io(io::Error::new(io::ErrorKind::InvalidData, "bad utf-8")).into();
        assert!(matches!(err, ChatError::InvalidFormat(_)));

        let err: ChatError = LinesCodecError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset")).into();
        assert!(matches!(err, ChatError::ConnectionError(_)));
    }

    #[test]
    fn test_error_display() {
        let err = AppError::ConfigError("missing key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing key");

        let err = AppError::Chat(ChatError::SendError("closed".to_string()));
        assert_eq!(err.to_string(), "Chat error: Message sending failed: closed");
    }
}
