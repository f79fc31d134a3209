// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as a configured owner, unique session names, and sane dispatch limits.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::VolleyConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &VolleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // The owner gate is the whole access model; refuse to run without it.
    if config.owner.id == 0 {
        errors.push(ConfigError::Validation {
            message: "owner.id must be set to the operator account id".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    let base_url = config.platform.base_url.trim();
    if base_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "platform.base_url must not be empty".to_string(),
        });
    } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("platform.base_url `{base_url}` must start with http:// or https://"),
        });
    }

    let mut seen_names = HashSet::new();
    for session in &config.platform.sessions {
        if !seen_names.insert(&session.name) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate session name `{}` in [[platform.sessions]] array",
                    session.name
                ),
            });
        }
    }

    for (i, session) in config.platform.sessions.iter().enumerate() {
        if session.name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("platform.sessions[{i}].name must not be empty"),
            });
        }
        if session.token.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("platform.sessions[{i}].token must not be empty"),
            });
        }
    }

    if config.dispatch.max_fanout == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.max_fanout must be at least 1".to_string(),
        });
    }

    if config.dispatch.network_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.network_attempts must be at least 1".to_string(),
        });
    }

    if config.dispatch.job_deadline_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.job_deadline_secs must be at least 1".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
