//! Configuration type definitions.

use serde::Deserialize;

use crate::protocol::api::packets::API_VERSION;
use crate::protocol::api::session as api_session;
use crate::protocol::chat::session as chat_session;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub chat: ChatConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Chat server connection and identity.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_host")]
    pub host: String,
    #[serde(default = "default_chat_port")]
    pub port: u16,
    pub uid: u32,
    pub name: String,
    /// Language room to join: ru, en, de, fr, pl or ua.
    #[serde(default = "default_language")]
    pub language: String,
    /// Clan chat to join after connecting.
    pub clan_id: Option<u32>,
    /// Display template for received lines.
    pub format: Option<String>,
}

/// Game API endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
    /// Client build string sent in every request trailer.
    #[serde(default = "default_api_version")]
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            version: default_api_version(),
        }
    }
}

fn default_chat_host() -> String {
    chat_session::DEFAULT_HOST.to_string()
}

fn default_chat_port() -> u16 {
    chat_session::DEFAULT_PORT
}

fn default_language() -> String {
    chat_session::languages::EN.to_string()
}

fn default_api_host() -> String {
    api_session::DEFAULT_HOST.to_string()
}

fn default_api_port() -> u16 {
    api_session::DEFAULT_PORT
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}
