//! Logging setup.
//!
//! When `RUST_LOG` is set it is used as-is; otherwise the workspace crates
//! default to `default_level` so a bare binary still reports connects,
//! disconnects and retries.
//!
//! ```bash
//! RUST_LOG=uaconn_client=debug my-app
//! ```

use std::env;

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

const WORKSPACE_CRATES: [&str; 4] = ["uaconn", "uaconn_core", "uaconn_channel", "uaconn_client"];

/// Builds the filter used by [`init`].
pub fn env_filter(default_level: &str) -> Result<EnvFilter> {
    let from_env = env::var(EnvFilter::DEFAULT_ENV).ok();
    filter_for(from_env.as_deref(), default_level)
}

/// Installs a global fmt subscriber. Fails if one is already installed.
pub fn init(default_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level)?)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

fn filter_for(directives: Option<&str>, default_level: &str) -> Result<EnvFilter> {
    if let Some(directives) = directives.filter(|d| !d.trim().is_empty()) {
        return EnvFilter::try_new(directives)
            .map_err(|e| anyhow!("invalid {}: {e}", EnvFilter::DEFAULT_ENV));
    }

    let mut filter = EnvFilter::default();
    for krate in WORKSPACE_CRATES {
        filter = filter.add_directive(format!("{krate}={default_level}").parse()?);
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_cover_workspace_crates() {
        let rendered = filter_for(None, "info").unwrap().to_string();
        for krate in WORKSPACE_CRATES {
            assert!(rendered.contains(&format!("{krate}=info")), "{rendered}");
        }
    }

    #[test]
    fn test_filter_accepts_levels() {
        for level in ["error", "warn", "info", "debug", "trace"] {
            assert!(filter_for(None, level).is_ok(), "level {level} rejected");
        }
    }

    #[test]
    fn test_filter_rejects_garbage_level() {
        assert!(filter_for(None, "not a level!").is_err());
    }

    #[test]
    fn test_rust_log_directives_win_over_defaults() {
        let rendered = filter_for(Some("uaconn_client=debug"), "info")
            .unwrap()
            .to_string();
        assert!(rendered.contains("uaconn_client=debug"), "{rendered}");
        assert!(!rendered.contains("uaconn_client=info"), "{rendered}");
    }

    #[test]
    fn test_env_filter_reads_rust_log() {
        env::set_var(EnvFilter::DEFAULT_ENV, "uaconn_core=trace");
        let rendered = env_filter("info").unwrap().to_string();
        env::remove_var(EnvFilter::DEFAULT_ENV);

        assert!(rendered.contains("uaconn_core=trace"), "{rendered}");
        assert!(!rendered.contains("uaconn_client=info"), "{rendered}");
    }

    #[test]
    fn test_blank_rust_log_falls_back_to_defaults() {
        let rendered = filter_for(Some("  "), "warn").unwrap().to_string();
        assert!(rendered.contains("uaconn_channel=warn"), "{rendered}");
    }

    #[test]
    fn test_invalid_rust_log_is_an_error() {
        assert!(filter_for(Some("uaconn_client=loud"), "info").is_err());
    }

    #[test]
    fn test_init_twice_fails() {
        // The first call may race other tests installing a subscriber; the
        // second one must fail either way.
        let _ = init("info");
        assert!(init("info").is_err());
    }
}
