//! Line protocol spoken between chat clients and the server.
//!
//! Every client line is either a slash command or chat text. Everything the
//! server sends is one of the [`ServerMessage`] variants rendered through
//! `Display`.

use std::fmt;
use chrono::{DateTime, TimeZone};

/// A single inbound line, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    List,
    Time,
    /// `None` when the command carried no target.
    Kick { target: Option<String> },
    Chat(String),
}

impl Command {
    /// Classify a raw line. Returns `None` for lines that are empty once
    /// trimmed. Commands are matched on prefix, so `/quit now` still quits.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let command = if line.starts_with("/quit") {
            Command::Quit
        } else if line.starts_with("/list") {
            Command::List
        } else if line.starts_with("/time") {
            Command::Time
        } else if line.starts_with("/kick") {
            let target = line
                .split_once(char::is_whitespace)
                .map(|(_, rest)| rest.trim())
                .filter(|rest| !rest.is_empty())
                .map(str::to_string);
            Command::Kick { target }
        } else {
            Command::Chat(line.to_string())
        };
        Some(command)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Welcome,
    NicknamePrompt,
    Joined(String),
    Left(String),
    Chat { from: String, text: String },
    Roster(Vec<String>),
    ServerTime(String),
    Kicked,
    YouKicked(String),
    WasKicked { target: String, by: String },
    KickUsage,
    NoSuchUser(String),
}

impl ServerMessage {
    pub fn server_time<Tz>(now: DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        ServerMessage::ServerTime(now.format("%H:%M:%S").to_string())
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Welcome => write!(f, "Welcome to the Go Socket Server!"),
            ServerMessage::NicknamePrompt => write!(f, "Please enter your nickname:"),
            ServerMessage::Joined(name) => write!(f, "{} joined the chat", name),
            ServerMessage::Left(name) => write!(f, "{} left the chat", name),
            ServerMessage::Chat { from, text } => write!(f, "[{}]: {}", from, text),
            ServerMessage::Roster(names) if names.is_empty() => write!(f, "No clients connected"),
            ServerMessage::Roster(names) => {
                write!(f, "Connected clients ({}):", names.len())?;
                for name in names {
                    write!(f, "\n- {}", name)?;
                }
                Ok(())
            }
            ServerMessage::ServerTime(time) => write!(f, "Server time: {}", time),
            ServerMessage::Kicked => write!(f, "You have been kicked!"),
            ServerMessage::YouKicked(name) => write!(f, "You have kicked {}", name),
            ServerMessage::WasKicked { target, by } => write!(f, "{} was kicked by {}", target, by),
            ServerMessage::KickUsage => write!(f, "Usage: /kick <nickname>"),
            ServerMessage::NoSuchUser(name) => write!(f, "No such user: {}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/quit"), Some(Command::Quit));
        assert_eq!(Command::parse("  /quit now please "), Some(Command::Quit));
        assert_eq!(Command::parse("/list"), Some(Command::List));
        assert_eq!(Command::parse("/time\r"), Some(Command::Time));
        assert_eq!(
            Command::parse("hello there"),
            Some(Command::Chat("hello there".to_string()))
        );
        assert_eq!(
            Command::parse("/shrug"),
            Some(Command::Chat("/shrug".to_string()))
        );
    }

    #[test]
    fn test_parse_empty_lines() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("   \t "), None);
    }

    #[test]
    fn test_parse_kick_target() {
        assert_eq!(
            Command::parse("/kick Bob"),
            Some(Command::Kick { target: Some("Bob".to_string()) })
        );
        assert_eq!(
            Command::parse("/kick \t  Bob"),
            Some(Command::Kick { target: Some("Bob".to_string()) })
        );
        assert_eq!(
            Command::parse("/kick Mary Ann"),
            Some(Command::Kick { target: Some("Mary Ann".to_string()) })
        );
        assert_eq!(Command::parse("/kick"), Some(Command::Kick { target: None }));
        assert_eq!(Command::parse("/kick   "), Some(Command::Kick { target: None }));
        assert_eq!(Command::parse("/kickBob"), Some(Command::Kick { target: None }));
    }

    #[test]
    fn test_roster_format() {
        assert_eq!(ServerMessage::Roster(vec![]).to_string(), "No clients connected");
        assert_eq!(
            ServerMessage::Roster(vec!["Alice".to_string(), "Bob".to_string()]).to_string(),
            "Connected clients (2):\n- Alice\n- Bob"
        );
    }

    #[test]
    fn test_server_time_format() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 3)
            .unwrap()
            .and_utc();
        assert_eq!(ServerMessage::server_time(at).to_string(), "Server time: 07:05:03");

        let now = ServerMessage::server_time(Utc::now()).to_string();
        let time = now.strip_prefix("Server time: ").unwrap();
        assert_eq!(time.len(), 8);
        assert_eq!(time.as_bytes()[2], b':');
        assert_eq!(time.as_bytes()[5], b':');
    }

    #[test]
    fn test_message_catalog() {
        assert_eq!(ServerMessage::Welcome.to_string(), "Welcome to the Go Socket Server!");
        assert_eq!(ServerMessage::NicknamePrompt.to_string(), "Please enter your nickname:");
        assert_eq!(ServerMessage::Joined("Bob".into()).to_string(), "Bob joined the chat");
        assert_eq!(ServerMessage::Left("Bob".into()).to_string(), "Bob left the chat");
        assert_eq!(
            ServerMessage::Chat { from: "Alice".into(), text: "hi".into() }.to_string(),
            "[Alice]: hi"
        );
        assert_eq!(ServerMessage::Kicked.to_string(), "You have been kicked!");
        assert_eq!(ServerMessage::YouKicked("Bob".into()).to_string(), "You have kicked Bob");
        assert_eq!(
            ServerMessage::WasKicked { target: "Bob".into(), by: "Alice".into() }.to_string(),
            "Bob was kicked by Alice"
        );
        assert_eq!(ServerMessage::KickUsage.to_string(), "Usage: /kick <nickname>");
        assert_eq!(ServerMessage::NoSuchUser("Eve".into()).to_string(), "No such user: Eve");
    }
}
