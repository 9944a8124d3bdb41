//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `SCHEROES_CHAT_HOST` - Chat server host
//! - `SCHEROES_CHAT_PORT` - Chat server port
//! - `SCHEROES_UID` - Player uid
//! - `SCHEROES_LANGUAGE` - Chat language room
//! - `SCHEROES_API_HOST` - Game API host
//! - `SCHEROES_API_PORT` - Game API port

use std::env;

use tracing::warn;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "SCHEROES";

fn var(name: &str) -> Option<String> {
    env::var(format!("{}_{}", ENV_PREFIX, name)).ok()
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    let value = var(name)?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring {}_{}: '{}' is not a valid number", ENV_PREFIX, name, value);
            None
        }
    }
}

/// Apply environment variable overrides to a config.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Some(host) = var("CHAT_HOST") {
        config.chat.host = host;
    }
    if let Some(port) = parsed_var("CHAT_PORT") {
        config.chat.port = port;
    }
    if let Some(uid) = parsed_var("UID") {
        config.chat.uid = uid;
    }
    if let Some(language) = var("LANGUAGE") {
        config.chat.language = language;
    }

    if let Some(host) = var("API_HOST") {
        config.api.host = host;
    }
    if let Some(port) = parsed_var("API_PORT") {
        config.api.port = port;
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `SCHEROES_CONFIG` environment variable, otherwise returns "scheroes.conf".
pub fn get_config_path() -> String {
    var("CONFIG").unwrap_or_else(|| "scheroes.conf".to_string())
}
