//! Configuration loading.

use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

use ssogate_auth::SsoConfig;

/// Points at a JSON config file; takes precedence over `SSOGATE_*` variables.
pub const CONFIG_PATH_VAR: &str = "SSOGATE_CONFIG";

pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<SsoConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read SSO config from {}", path.display()))?;
    let config = SsoConfig::from_json_str(&raw)
        .with_context(|| format!("invalid SSO config in {}", path.display()))?;
    info!(path = %path.display(), config = %config.display_json(), "SSO config loaded");
    Ok(config)
}

/// Load from the file named by `SSOGATE_CONFIG`, else from the environment.
pub fn load() -> anyhow::Result<SsoConfig> {
    match std::env::var(CONFIG_PATH_VAR) {
        Ok(path) if !path.trim().is_empty() => load_from_file(path.trim()),
        _ => {
            warn!("{CONFIG_PATH_VAR} not set, reading SSO config from environment");
            let config = SsoConfig::from_env().context("invalid SSO config in environment")?;
            info!(config = %config.display_json(), "SSO config loaded");
            Ok(config)
        }
    }
}
