use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatSettings {
    pub default_nickname: String,
    pub max_line_length: usize,
    pub outbound_queue: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            default_nickname: "Anonymous".to_string(),
            max_line_length: 4096,
            outbound_queue: 256,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub client: ClientConfig,
    pub chat: ChatSettings,
    pub log: LogConfig,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ClientConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn with_defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let chat = ChatSettings::default();
    Config::builder()
        .set_default("environment", environment)?
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("server.workers", num_cpus::get() as i64)?
        .set_default("client.host", "localhost")?
        .set_default("client.port", 8080)?
        .set_default("chat.default_nickname", chat.default_nickname)?
        .set_default("chat.max_line_length", chat.max_line_length as i64)?
        .set_default("chat.outbound_queue", chat.outbound_queue as i64)?
        .set_default("log.level", "info")
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = with_defaults("development")?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_SERVER__PORT=5001` would set `Settings.server.port`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        s.try_deserialize()
    }

    #[cfg(test)]
    pub fn new_for_test() -> Result<Self, ConfigError> {
        with_defaults("test")?
            .set_override("server.host", "127.0.0.1")?
            .set_override("server.port", 0)?
            .build()?
            .try_deserialize()
    }
}
