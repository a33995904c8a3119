//! Tracing/logging initialization.
//!
//! Login events carry structured fields (`subject_id`, `display_name`,
//! `status`, `body`), so the default output is one JSON object per line.

use tracing_subscriber::EnvFilter;

/// Output format override, read from the environment.
pub const LOG_FORMAT_VAR: &str = "SSOGATE_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_filter: String,
    /// JSON lines; `false` selects the human-readable formatter.
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            json: true,
        }
    }
}

impl TracingConfig {
    pub fn from_env() -> Self {
        Self::from_format(std::env::var(LOG_FORMAT_VAR).ok().as_deref())
    }

    fn from_format(format: Option<&str>) -> Self {
        let json = !matches!(
            format.map(str::trim).map(str::to_ascii_lowercase).as_deref(),
            Some("pretty" | "text")
        );
        Self {
            json,
            ..Self::default()
        }
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(config: &TracingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_the_default_format() {
        assert!(TracingConfig::from_format(None).json);
        assert!(TracingConfig::from_format(Some("json")).json);
        assert!(!TracingConfig::from_format(Some(" Pretty ")).json);
    }

    #[test]
    fn repeated_init_is_harmless() {
        let config = TracingConfig::default();
        init(&config);
        init(&config);
        ::tracing::info!(subject_id = "1", "still logging");
    }
}
