// SPDX-FileCopyrightText: 2026 Volley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Volley reporting toolkit.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use volley_core::SessionCredential;

/// Top-level Volley configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values, except `owner.id`
/// which must be set before any command runs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VolleyConfig {
    /// Operator identity. Every privileged command is checked against this.
    #[serde(default)]
    pub owner: OwnerConfig,

    /// Session pool and cooldown settings.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Fan-out and retry settings for dispatched jobs.
    #[serde(default)]
    pub dispatch: DispatchSection,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session gateway settings and the session roster.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Operator identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OwnerConfig {
    /// Account id of the operator. Commands from any other id are denied.
    /// Must be set explicitly; the default of 0 fails validation.
    #[serde(default)]
    pub id: i64,
}

impl Default for OwnerConfig {
    fn default() -> Self {
        Self { id: 0 }
    }
}

/// Session pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Cooldown applied when the platform rate-limits a session without
    /// naming a wait, in seconds. Doubles per consecutive strike.
    #[serde(default = "default_fallback_cooldown_secs")]
    pub fallback_cooldown_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            fallback_cooldown_secs: default_fallback_cooldown_secs(),
        }
    }
}

fn default_fallback_cooldown_secs() -> u64 {
    60
}

/// Fan-out and retry configuration for dispatched jobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchSection {
    /// Overall deadline for a fan-out job, in seconds. Attempts still
    /// outstanding when it passes are abandoned.
    #[serde(default = "default_job_deadline_secs")]
    pub job_deadline_secs: u64,

    /// How long a single-session command waits for a free session, in seconds.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// How long a rate-limited lookup waits for a different session before
    /// giving up, in seconds.
    #[serde(default = "default_lookup_retry_wait_secs")]
    pub lookup_retry_wait_secs: u64,

    /// Maximum number of sessions a single job fans out across.
    #[serde(default = "default_max_fanout")]
    pub max_fanout: usize,

    /// Total attempts made per session when a call fails with a network error.
    #[serde(default = "default_network_attempts")]
    pub network_attempts: u32,

    /// Base delay between network retries, in milliseconds. Doubles per attempt.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            job_deadline_secs: default_job_deadline_secs(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            lookup_retry_wait_secs: default_lookup_retry_wait_secs(),
            max_fanout: default_max_fanout(),
            network_attempts: default_network_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

fn default_job_deadline_secs() -> u64 {
    60
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

fn default_lookup_retry_wait_secs() -> u64 {
    5
}

fn default_max_fanout() -> usize {
    64
}

fn default_network_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("volley").join("volley.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("volley.db"))
        .to_string_lossy()
        .into_owned()
}

/// Session gateway configuration and the session roster.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Base URL of the local session gateway.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sessions available to the pool. Each entry connects independently;
    /// a session that fails to connect is skipped, not fatal.
    #[serde(default)]
    pub sessions: Vec<SessionEntry>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            sessions: Vec::new(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8081".to_string()
}

/// One configured session.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionEntry {
    /// Name the session appears under in logs and status output.
    pub name: String,

    /// Gateway token for this session.
    pub token: String,
}

impl SessionEntry {
    /// Wrap the entry's token as a credential for the connector.
    pub fn credential(&self) -> SessionCredential {
        SessionCredential {
            name: self.name.clone(),
            token: SecretString::from(self.token.clone()),
        }
    }
}

// Tokens never reach log output, Debug included.
impl fmt::Debug for SessionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEntry")
            .field("name", &self.name)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn sessions_array_deserializes() {
        let toml_str = r#"
[owner]
id = 42

[[platform.sessions]]
name = "alpha"
token = "token-a"

[[platform.sessions]]
name = "beta"
token = "token-b"
"#;
        let config: VolleyConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.owner.id, 42);
        assert_eq!(config.platform.sessions.len(), 2);
        assert_eq!(config.platform.sessions[0].name, "alpha");
        assert_eq!(config.platform.sessions[1].name, "beta");
        assert_eq!(config.platform.base_url, "http://127.0.0.1:8081");
    }

    #[test]
    fn session_entry_denies_unknown_fields() {
        let toml_str = r#"
[[platform.sessions]]
name = "alpha"
token = "token-a"
api_key = "bad"
"#;
        assert!(toml::from_str::<VolleyConfig>(toml_str).is_err());
    }

    #[test]
    fn session_entry_debug_redacts_token() {
        let entry = SessionEntry {
            name: "alpha".to_string(),
            token: "super-secret".to_string(),
        };
        let rendered = format!("{entry:?}");
        assert!(rendered.contains("alpha"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn credential_carries_name_and_token() {
        let entry = SessionEntry {
            name: "alpha".to_string(),
            token: "super-secret".to_string(),
        };
        let credential = entry.credential();
        assert_eq!(credential.name, "alpha");
        assert_eq!(credential.token.expose_secret(), "super-secret");
    }

    #[test]
    fn dispatch_defaults_apply() {
        let config = VolleyConfig::default();
        assert_eq!(config.dispatch.job_deadline_secs, 60);
        assert_eq!(config.dispatch.acquire_timeout_secs, 10);
        assert_eq!(config.dispatch.max_fanout, 64);
        assert_eq!(config.dispatch.network_attempts, 3);
        assert_eq!(config.pool.fallback_cooldown_secs, 60);
    }
}
