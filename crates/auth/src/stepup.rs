//! Step-up freshness for sensitive account operations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::StepUpConfig;
use crate::session::{LAST_LOGIN_SECRET, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepUpStatus {
    Ok,
    ReauthRequired,
}

/// Decide whether `operation` may proceed on the strength of the last login.
///
/// Operations not listed as sensitive always pass. For listed ones the last
/// SSO login must be strictly less than `window_secs` away from `now`.
pub fn check_freshness(
    config: &StepUpConfig,
    operation: &str,
    session: &dyn SessionStore,
    now: DateTime<Utc>,
) -> StepUpStatus {
    if !config.sensitive_operations.contains(operation) {
        return StepUpStatus::Ok;
    }

    let Some(last_login) = session
        .get_secret(LAST_LOGIN_SECRET)
        .and_then(|raw| raw.trim().parse::<i64>().ok())
    else {
        return StepUpStatus::ReauthRequired;
    };

    let elapsed = now.timestamp().saturating_sub(last_login).unsigned_abs();
    if elapsed < config.window_secs {
        StepUpStatus::Ok
    } else {
        StepUpStatus::ReauthRequired
    }
}
