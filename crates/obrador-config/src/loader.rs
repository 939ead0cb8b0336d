// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./obrador.toml` > `~/.config/obrador/obrador.toml` > `/etc/obrador/obrador.toml`
//! with environment variable overrides via `OBRADOR_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ObradorConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/obrador/obrador.toml` (system-wide)
/// 3. `~/.config/obrador/obrador.toml` (user XDG config)
/// 4. `./obrador.toml` (local directory)
/// 5. `OBRADOR_*` environment variables
pub fn load_config() -> Result<ObradorConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ObradorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ObradorConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ObradorConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ObradorConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ObradorConfig::default()))
        .merge(Toml::file("/etc/obrador/obrador.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("obrador/obrador.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("obrador.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `OBRADOR_STORAGE_DATABASE_PATH` must map to
/// `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("OBRADOR_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("app_", "app.", 1)
            .replacen("tenant_", "tenant.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("pricing_", "pricing.", 1)
            .replacen("intake_", "intake.", 1);
        mapped.into()
    })
}
