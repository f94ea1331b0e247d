// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./atende.toml` > `~/.config/atende/atende.toml`
//! > `/etc/atende/atende.toml` with environment variable overrides via the
//! `ATENDE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::AtendeConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/atende/atende.toml` (system-wide)
/// 3. `~/.config/atende/atende.toml` (user XDG config)
/// 4. `./atende.toml` (local directory)
/// 5. `ATENDE_*` environment variables
pub fn load_config() -> Result<AtendeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AtendeConfig::default()))
        .merge(Toml::file("/etc/atende/atende.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("atende/atende.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("atende.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<AtendeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AtendeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AtendeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AtendeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `ATENDE_STORAGE_DATABASE_PATH` must map
/// to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("ATENDE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: ATENDE_WHATSAPP_BRIDGE_URL -> "whatsapp_bridge_url"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("server_", "server.", 1)
            .replacen("auth_", "auth.", 1)
            .replacen("whatsapp_", "whatsapp.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("uploads_", "uploads.", 1)
            .replacen("routing_", "routing.", 1);
        mapped.into()
    })
}
