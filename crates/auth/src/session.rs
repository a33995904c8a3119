//! Per-request session collaborator.
//!
//! Implemented by the glue layer on top of whatever session machinery the
//! host application has; the engine never reaches for a global session.

use crate::account::{Account, AccountName};

/// Post-login redirect target, written at redirect and consumed at callback.
pub const RETURN_TO_KEY: &str = "returnto";

/// CSRF state issued with the authorization URL.
pub const STATE_KEY: &str = "oauth2state";

/// Epoch seconds of the last completed SSO login, read by step-up checks.
pub const LAST_LOGIN_SECRET: &str = "ssogate_last_login";

pub trait SessionStore {
    /// Make sure the session outlives this request (issue the cookie).
    fn persist(&mut self);

    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String);

    fn remove(&mut self, key: &str);

    fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Flush pending writes.
    fn save(&mut self);

    /// Values that must never be sent to the user agent.
    fn set_secret(&mut self, name: &str, value: String);

    fn get_secret(&self, name: &str) -> Option<String>;

    /// Account currently logged in on this session, if any.
    fn user(&self) -> Option<AccountName>;

    /// Log `account` in; `persistent` selects a long-lived login cookie.
    fn set_user(&mut self, account: &Account, persistent: bool);

    fn logout(&mut self);
}
