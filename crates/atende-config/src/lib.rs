// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Atende support desk.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and miette diagnostic rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use atende_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Service name: {}", config.service.name);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::AtendeConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// This is the high-level entry point that:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to miette diagnostics with typo suggestions
///
/// Returns either a valid `AtendeConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<AtendeConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<AtendeConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_and_validate() {
        let config = load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.service.name, "atende");
        assert_eq!(config.server.port, 10000);
        assert_eq!(config.routing.default_department, "Atendimento");
    }

    #[test]
    fn unknown_key_yields_diagnostic() {
        let errors = load_and_validate_str("[server]\nprot = 8080\n").unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn overrides_merge_over_defaults() {
        let config = load_and_validate_str(
            r#"
[server]
port = 8080

[whatsapp]
bridge_url = "http://bridge:3001"
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.whatsapp.bridge_url, "http://bridge:3001");
        // Untouched sections keep defaults.
        assert_eq!(config.service.log_level, "info");
    }
}
