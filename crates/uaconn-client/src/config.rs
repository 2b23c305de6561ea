//! Client configuration.
//!
//! Everything is fixed at construction time: supervisors and pools copy what
//! they need out of a [`ClientConfig`] and never look at it again.
//!
//! # Example
//!
//! ```rust
//! use uaconn_client::ClientConfig;
//!
//! let config = ClientConfig::from_toml_str(r#"
//!     [endpoint]
//!     url = "opc.tcp://plc-01:4840"
//!
//!     [pool]
//!     max_size = 8
//! "#).unwrap();
//!
//! assert_eq!(config.pool.max_size, 8);
//! assert_eq!(config.supervisor.retry_interval_ms, 5000);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uaconn_channel::{EndpointConfig, UserIdentity};
use uaconn_core::SamplingInterval;

use crate::error::ConfigError;

/// Environment variable overriding `endpoint.url`.
pub const ENV_ENDPOINT: &str = "UACONN_ENDPOINT";

/// Environment variable overriding `pool.max_size`.
pub const ENV_POOL_MAX_SIZE: &str = "UACONN_POOL_MAX_SIZE";

const ENDPOINT_SCHEMES: [&str; 3] = ["opc.tcp://", "opc.https://", "opc.wss://"];

// ============================================================================
// Sections
// ============================================================================

/// Session name and identity used for every channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session name sent on CreateSession.
    pub name: String,

    /// Identity presented on ActivateSession.
    pub identity: UserIdentity,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: "uaconn-session".to_string(),
            identity: UserIdentity::Anonymous,
        }
    }
}

/// Reconnection supervisor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Fixed delay between reconnect attempts.
    pub retry_interval_ms: u64,

    /// Sampling interval used by `subscribe_default`.
    pub default_sampling_interval_ms: f64,

    /// Capacity of the event broadcast channel. Slow receivers lag past this.
    pub event_buffer: usize,

    /// Upper bound for a single dispose call on a channel or subscription.
    pub dispose_timeout_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: 5000,
            default_sampling_interval_ms: SamplingInterval::DEFAULT_MILLIS,
            event_buffer: 1024,
            dispose_timeout_ms: 2000,
        }
    }
}

impl SupervisorConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn dispose_timeout(&self) -> Duration {
        Duration::from_millis(self.dispose_timeout_ms)
    }

    /// Falls back to the 1000 ms default if the configured value is invalid.
    pub fn default_sampling_interval(&self) -> SamplingInterval {
        SamplingInterval::from_millis(self.default_sampling_interval_ms).unwrap_or_default()
    }
}

/// Channel pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of channels alive at once (idle + rented + opening).
    pub max_size: usize,

    /// Upper bound for disposing one pooled channel.
    pub dispose_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 4,
            dispose_timeout_ms: 2000,
        }
    }
}

impl PoolConfig {
    pub fn dispose_timeout(&self) -> Duration {
        Duration::from_millis(self.dispose_timeout_ms)
    }
}

// ============================================================================
// Client Config
// ============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: EndpointConfig,
    pub session: SessionConfig,
    pub supervisor: SupervisorConfig,
    pub pool: PoolConfig,
}

impl ClientConfig {
    /// Default configuration pointing at `url`.
    pub fn for_endpoint(url: impl Into<String>) -> Self {
        Self {
            endpoint: EndpointConfig::new(url),
            ..Default::default()
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Applies `UACONN_ENDPOINT` / `UACONN_POOL_MAX_SIZE` from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary lookup, then re-validates.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup(ENV_ENDPOINT) {
            self.endpoint.url = url;
        }
        if let Some(raw) = lookup(ENV_POOL_MAX_SIZE) {
            self.pool.max_size = raw.trim().parse().map_err(|_| {
                ConfigError::invalid("pool.max_size", format!("{raw:?} is not a number"))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !ENDPOINT_SCHEMES
            .iter()
            .any(|scheme| self.endpoint.url.starts_with(scheme))
        {
            return Err(ConfigError::invalid(
                "endpoint.url",
                format!(
                    "{:?} must start with one of {}",
                    self.endpoint.url,
                    ENDPOINT_SCHEMES.join(", ")
                ),
            ));
        }
        if !self.endpoint.is_security_consistent() {
            return Err(ConfigError::invalid(
                "endpoint.security_mode",
                format!(
                    "{:?} cannot be combined with policy {:?}",
                    self.endpoint.security_mode, self.endpoint.security_policy
                ),
            ));
        }
        if self.session.name.trim().is_empty() {
            return Err(ConfigError::invalid("session.name", "must not be empty"));
        }
        if self.supervisor.retry_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "supervisor.retry_interval_ms",
                "must be greater than 0",
            ));
        }
        if let Err(e) = SamplingInterval::from_millis(self.supervisor.default_sampling_interval_ms)
        {
            return Err(ConfigError::invalid(
                "supervisor.default_sampling_interval_ms",
                e.to_string(),
            ));
        }
        if self.supervisor.event_buffer == 0 {
            return Err(ConfigError::invalid(
                "supervisor.event_buffer",
                "must be at least 1",
            ));
        }
        if self.pool.max_size == 0 {
            return Err(ConfigError::invalid("pool.max_size", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use uaconn_channel::{MessageSecurityMode, SecurityPolicy};

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pool.max_size, 4);
        assert_eq!(config.supervisor.retry_interval(), Duration::from_secs(5));
        assert_eq!(config.supervisor.dispose_timeout(), Duration::from_secs(2));
        assert_eq!(
            config.supervisor.default_sampling_interval(),
            SamplingInterval::default()
        );
    }

    #[test]
    fn test_full_toml_document() {
        let config = ClientConfig::from_toml_str(
            r#"
            [endpoint]
            url = "opc.tcp://plc-01:4840"
            security_policy = "Basic256Sha256"
            security_mode = "SignAndEncrypt"
            application_name = "line-monitor"

            [session]
            name = "line-1"
            identity = { kind = "user_name", user = "operator", password = "secret" }

            [supervisor]
            retry_interval_ms = 250
            default_sampling_interval_ms = 500.0

            [pool]
            max_size = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoint.url, "opc.tcp://plc-01:4840");
        assert_eq!(config.endpoint.security_policy, SecurityPolicy::Basic256Sha256);
        assert_eq!(
            config.endpoint.security_mode,
            MessageSecurityMode::SignAndEncrypt
        );
        assert_eq!(config.session.name, "line-1");
        assert_eq!(
            config.session.identity,
            UserIdentity::user_name("operator", "secret")
        );
        assert_eq!(config.supervisor.retry_interval_ms, 250);
        assert_eq!(config.supervisor.event_buffer, 1024);
        assert_eq!(config.pool.max_size, 2);
    }

    #[test]
    fn test_rejects_bad_scheme() {
        let result = ClientConfig::from_toml_str("[endpoint]\nurl = \"http://plc:4840\"");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "endpoint.url",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_inconsistent_security() {
        let result = ClientConfig::from_toml_str(
            "[endpoint]\nurl = \"opc.tcp://plc:4840\"\nsecurity_policy = \"Basic256Sha256\"",
        );
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "endpoint.security_mode",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_zero_pool_and_bad_interval() {
        assert!(ClientConfig::from_toml_str("[pool]\nmax_size = 0").is_err());
        assert!(
            ClientConfig::from_toml_str("[supervisor]\ndefault_sampling_interval_ms = -1.0")
                .is_err()
        );
        assert!(ClientConfig::from_toml_str("[supervisor]\nretry_interval_ms = 0").is_err());
    }

    #[test]
    fn test_parse_error() {
        let result = ClientConfig::from_toml_str("[pool\nmax_size = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::default()
            .with_overrides(|key| match key {
                ENV_ENDPOINT => Some("opc.tcp://override:4841".to_string()),
                ENV_POOL_MAX_SIZE => Some(" 16 ".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.endpoint.url, "opc.tcp://override:4841");
        assert_eq!(config.pool.max_size, 16);
    }

    #[test]
    fn test_override_not_a_number() {
        let result = ClientConfig::default().with_overrides(|key| {
            (key == ENV_POOL_MAX_SIZE).then(|| "many".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "pool.max_size",
                ..
            })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[endpoint]\nurl = \"opc.tcp://from-file:4840\"").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.endpoint.url, "opc.tcp://from-file:4840");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClientConfig::load(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
