// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as valid bind addresses, non-empty paths, and sane
//! backoff parameters.

use crate::diagnostic::ConfigError;
use crate::model::AtendeConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &AtendeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Bind address must be a plausible IP or hostname.
    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.uploads.dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "uploads.dir must not be empty".to_string(),
        });
    }

    if config.uploads.max_file_size_bytes == 0 {
        errors.push(ConfigError::Validation {
            message: "uploads.max_file_size_bytes must be positive".to_string(),
        });
    }

    let url = config.whatsapp.bridge_url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("whatsapp.bridge_url `{url}` must be an http(s) URL"),
        });
    }

    if config.whatsapp.send_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "whatsapp.send_timeout_secs must be positive".to_string(),
        });
    }

    if config.whatsapp.reconnect_base_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "whatsapp.reconnect_base_secs must be positive".to_string(),
        });
    }

    if config.whatsapp.reconnect_max_secs < config.whatsapp.reconnect_base_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "whatsapp.reconnect_max_secs ({}) must be >= reconnect_base_secs ({})",
                config.whatsapp.reconnect_max_secs, config.whatsapp.reconnect_base_secs
            ),
        });
    }

    if config.whatsapp.reconnect_max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "whatsapp.reconnect_max_attempts must be at least 1".to_string(),
        });
    }

    if config.routing.default_department.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "routing.default_department must not be empty".to_string(),
        });
    }

    // Token values map to agent ids; an empty id would silently authenticate
    // to nobody.
    for (token, agent_id) in &config.auth.tokens {
        if agent_id.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!(
                    "auth.tokens entry `{}…` maps to an empty agent id",
                    token.chars().take(4).collect::<String>()
                ),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = AtendeConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = AtendeConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn non_http_bridge_url_fails_validation() {
        let mut config = AtendeConfig::default();
        config.whatsapp.bridge_url = "localhost:3001".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("bridge_url"))));
    }

    #[test]
    fn backoff_cap_below_base_fails_validation() {
        let mut config = AtendeConfig::default();
        config.whatsapp.reconnect_base_secs = 60;
        config.whatsapp.reconnect_max_secs = 10;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("reconnect_max_secs"))));
    }

    #[test]
    fn empty_token_target_fails_validation() {
        let mut config = AtendeConfig::default();
        config
            .auth
            .tokens
            .insert("secret-token".to_string(), " ".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("empty agent id"))));
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = AtendeConfig::default();
        config.server.host = "0.0.0.0".to_string();
        config.storage.database_path = "/tmp/atende.db".to_string();
        config.whatsapp.bridge_url = "http://bridge:3001".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn sections_deny_unknown_fields() {
        let toml_str = r#"
[whatsapp]
brige_url = "http://localhost:3001"
"#;
        let result = toml::from_str::<AtendeConfig>(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn upload_extension_lists_deserialize() {
        let toml_str = r#"
[uploads]
image_extensions = ["png"]
"#;
        let config: AtendeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.uploads.image_extensions, vec!["png"]);
        // Untouched sections keep their defaults.
        assert_eq!(config.uploads.max_file_size_bytes, 16 * 1024 * 1024);
    }
}
