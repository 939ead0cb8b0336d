// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Obrador order-intake framework.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Obrador configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ObradorConfig {
    /// Application identity and logging.
    #[serde(default)]
    pub app: AppConfig,

    /// Tenant the operator tools act on.
    #[serde(default)]
    pub tenant: TenantConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Surcharge and commission arithmetic.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Conversational intake behavior.
    #[serde(default)]
    pub intake: IntakeConfig,
}

/// Application identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name used in logs and CLI output.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "obrador".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Tenant selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TenantConfig {
    /// Tenant identifier stamped on sessions, folios and commissions.
    #[serde(default = "default_tenant_id")]
    pub id: String,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            id: default_tenant_id(),
        }
    }
}

fn default_tenant_id() -> String {
    "default".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("obrador").join("obrador.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("obrador.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Surcharge and commission arithmetic.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// Commission as a percentage of the subtotal.
    #[serde(default = "default_commission_rate_percent")]
    pub commission_rate_percent: f64,

    /// Surcharge per block of persons for each filling that carries a cost.
    #[serde(default = "default_filling_surcharge")]
    pub filling_surcharge: f64,

    /// Size of a surcharge block, in persons.
    #[serde(default = "default_persons_per_surcharge_block")]
    pub persons_per_surcharge_block: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            commission_rate_percent: default_commission_rate_percent(),
            filling_surcharge: default_filling_surcharge(),
            persons_per_surcharge_block: default_persons_per_surcharge_block(),
        }
    }
}

fn default_commission_rate_percent() -> f64 {
    5.0
}

fn default_filling_surcharge() -> f64 {
    30.0
}

fn default_persons_per_surcharge_block() -> u32 {
    20
}

/// Conversational intake configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntakeConfig {
    /// Seconds to wait for the assistant before reporting it unavailable.
    #[serde(default = "default_assistant_timeout_secs")]
    pub assistant_timeout_secs: u64,

    /// Honour the assistant's finalize intent without an operator click.
    #[serde(default = "default_auto_finalize")]
    pub auto_finalize: bool,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            assistant_timeout_secs: default_assistant_timeout_secs(),
            auto_finalize: default_auto_finalize(),
        }
    }
}

fn default_assistant_timeout_secs() -> u64 {
    30
}

fn default_auto_finalize() -> bool {
    true
}
