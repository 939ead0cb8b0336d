// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks serde cannot express: non-empty identifiers, the
//! commission percentage range and positive surcharge blocks.

use crate::diagnostic::ConfigError;
use crate::model::ObradorConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Checks `config`, collecting every problem instead of stopping at the first.
pub fn validate_config(config: &ObradorConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut check = |ok: bool, key: &str, reason: String| {
        if !ok {
            errors.push(ConfigError::invalid(key, reason));
        }
    };

    let level = config.app.log_level.to_ascii_lowercase();
    check(
        LOG_LEVELS.contains(&level.as_str()),
        "app.log_level",
        format!(
            "`{}` is not one of {}",
            config.app.log_level,
            LOG_LEVELS.join(", ")
        ),
    );
    check(
        !config.tenant.id.trim().is_empty(),
        "tenant.id",
        "must not be empty".into(),
    );
    check(
        !config.storage.database_path.trim().is_empty(),
        "storage.database_path",
        "must not be empty".into(),
    );

    let pricing = &config.pricing;
    check(
        (0.0..=100.0).contains(&pricing.commission_rate_percent),
        "pricing.commission_rate_percent",
        format!("must be within 0-100, got {}", pricing.commission_rate_percent),
    );
    check(
        pricing.filling_surcharge >= 0.0,
        "pricing.filling_surcharge",
        format!("must be non-negative, got {}", pricing.filling_surcharge),
    );
    check(
        pricing.persons_per_surcharge_block >= 1,
        "pricing.persons_per_surcharge_block",
        "must be at least 1".into(),
    );
    check(
        config.intake.assistant_timeout_secs >= 1,
        "intake.assistant_timeout_secs",
        "must be at least 1 second".into(),
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
