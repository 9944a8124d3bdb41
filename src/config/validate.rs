//! Configuration validation.
//!
//! Collects every problem so the user can fix them in one pass.

use crate::common::error::ConfigError;
use crate::config::types::Config;
use crate::protocol::chat::languages;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.chat.host.is_empty() {
        errors.push("chat.host is required".to_string());
    }
    if config.chat.port == 0 {
        errors.push("chat.port must be non-zero".to_string());
    }
    if config.chat.uid == 0 {
        errors.push("chat.uid must be non-zero".to_string());
    }
    if config.chat.name.trim().is_empty() {
        errors.push("chat.name is required".to_string());
    }
    if !languages::ALL.contains(&config.chat.language.as_str()) {
        errors.push(format!(
            "chat.language '{}' is invalid (use: {})",
            config.chat.language,
            languages::ALL.join(", ")
        ));
    }

    if config.api.host.is_empty() {
        errors.push("api.host is required".to_string());
    }
    if config.api.port == 0 {
        errors.push("api.port must be non-zero".to_string());
    }
    if config.api.version.len() > usize::from(u8::MAX) {
        errors.push(format!(
            "api.version must be at most 255 bytes (got {})",
            config.api.version.len()
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
