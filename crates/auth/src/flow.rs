//! Login orchestration across the redirect and callback requests.
//!
//! `begin_login` runs on the request that sends the user to the provider,
//! `complete_login` on the provider's callback. Nothing is written to the
//! account store or bound to the session until the policy has allowed the
//! identity.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use ssogate_core::{Clock, SystemClock};

use crate::account::{
    Account, AccountName, AccountStore, PERSIST_LOGIN_PREFERENCE, PageResolver, is_truthy,
};
use crate::claims::{IdentityClaims, extract_claims};
use crate::config::SsoConfig;
use crate::directory::DirectoryClient;
use crate::error::{ErrorKind, LoginError};
use crate::http::HttpTransport;
use crate::policy;
use crate::provider::{AuthorizationState, ProviderClient};
use crate::session::{LAST_LOGIN_SECRET, RETURN_TO_KEY, STATE_KEY, SessionStore};
use crate::stepup::{self, StepUpStatus};

/// Progress of one login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoginState {
    #[default]
    Start,
    Redirected,
    CallbackReceived,
    TokenExchanged,
    ClaimsExtracted,
    AffiliationResolved,
    Authorized,
    AccountBound,
    SessionEstablished,
    Failed(ErrorKind),
}

impl core::fmt::Display for LoginState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LoginState::Start => f.write_str("start"),
            LoginState::Redirected => f.write_str("redirected"),
            LoginState::CallbackReceived => f.write_str("callback_received"),
            LoginState::TokenExchanged => f.write_str("token_exchanged"),
            LoginState::ClaimsExtracted => f.write_str("claims_extracted"),
            LoginState::AffiliationResolved => f.write_str("affiliation_resolved"),
            LoginState::Authorized => f.write_str("authorized"),
            LoginState::AccountBound => f.write_str("account_bound"),
            LoginState::SessionEstablished => f.write_str("session_established"),
            LoginState::Failed(kind) => write!(f, "failed({kind})"),
        }
    }
}

/// Query parameters of the provider callback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

impl CallbackParams {
    pub fn new(code: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            state: Some(state.into()),
        }
    }
}

/// Where to send the user agent after `begin_login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedLogin {
    /// Post-login destination.
    pub redirect_url: String,
    pub account: Account,
    /// Whether the login cookie was made persistent.
    pub persistent: bool,
    pub state: LoginState,
}

/// A login attempt that stopped before the session was established.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("login failed after {reached}: {error}")]
pub struct LoginFailure {
    /// Last state reached before the failure.
    pub reached: LoginState,
    #[source]
    pub error: LoginError,
}

impl LoginFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn state(&self) -> LoginState {
        LoginState::Failed(self.error.kind())
    }

    pub fn user_message(&self) -> String {
        self.error.user_message()
    }
}

/// Tracks and traces the state of a single attempt.
struct Attempt {
    state: LoginState,
}

impl Attempt {
    fn at(state: LoginState) -> Self {
        Self { state }
    }

    fn advance(&mut self, next: LoginState) {
        debug!(from = %self.state, to = %next, "login transition");
        self.state = next;
    }

    fn fail(&self, error: LoginError) -> LoginFailure {
        warn!(
            reached = %self.state,
            kind = %error.kind(),
            error = %error,
            "login attempt failed"
        );
        LoginFailure {
            reached: self.state,
            error,
        }
    }
}

pub struct LoginFlow {
    config: Arc<SsoConfig>,
    provider: ProviderClient,
    directory: DirectoryClient,
    clock: Arc<dyn Clock>,
}

impl LoginFlow {
    pub fn new(config: SsoConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let config = Arc::new(config);
        let provider = ProviderClient::new(config.clone(), transport.clone());
        let directory = DirectoryClient::new(config.endpoints.affiliation_url.clone(), transport);
        Self {
            config,
            provider,
            directory,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SsoConfig {
        &self.config
    }

    /// Redirect step: remember where to return, issue a fresh state.
    pub fn begin_login(
        &self,
        session: &mut dyn SessionStore,
        return_target: Option<&str>,
    ) -> Result<LoginRedirect, LoginError> {
        let mut attempt = Attempt::at(LoginState::Start);
        session.persist();

        match return_target.map(str::trim).filter(|t| !t.is_empty()) {
            Some(target) => session.set(RETURN_TO_KEY, target.to_owned()),
            None => session.remove(RETURN_TO_KEY),
        }

        let (url, state) = self.provider.begin().map_err(|e| attempt.fail(e).error)?;
        session.set(STATE_KEY, state.as_str().to_owned());
        session.save();

        attempt.advance(LoginState::Redirected);
        Ok(LoginRedirect { url })
    }

    /// Callback step: verify, identify, authorize, then bind the session.
    pub fn complete_login(
        &self,
        session: &mut dyn SessionStore,
        accounts: &dyn AccountStore,
        pages: &dyn PageResolver,
        callback: &CallbackParams,
    ) -> Result<CompletedLogin, LoginFailure> {
        let mut attempt = Attempt::at(LoginState::Redirected);
        match self.run_callback(&mut attempt, session, accounts, pages, callback) {
            Ok(done) => Ok(done),
            Err(e) => {
                // The state was consumed either way.
                session.save();
                Err(attempt.fail(e))
            }
        }
    }

    /// Whether `operation` may proceed without a fresh login.
    pub fn check_step_up_freshness(
        &self,
        operation: &str,
        session: &dyn SessionStore,
    ) -> StepUpStatus {
        let status =
            stepup::check_freshness(&self.config.step_up, operation, session, self.clock.now());
        if status == StepUpStatus::ReauthRequired {
            info!(operation, "step-up re-authentication required");
        }
        status
    }

    fn run_callback(
        &self,
        attempt: &mut Attempt,
        session: &mut dyn SessionStore,
        accounts: &dyn AccountStore,
        pages: &dyn PageResolver,
        callback: &CallbackParams,
    ) -> Result<CompletedLogin, LoginError> {
        let stored = session.get(STATE_KEY);
        session.remove(STATE_KEY);
        let state_matches = match (stored, callback.state.as_deref()) {
            (Some(stored), Some(presented)) if !stored.is_empty() => {
                AuthorizationState::from_stored(stored).matches(presented)
            }
            _ => false,
        };
        if !state_matches {
            return Err(LoginError::StateMismatch);
        }

        let code = callback
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(LoginError::MissingAuthorizationCode)?;
        attempt.advance(LoginState::CallbackReceived);

        let token = self.provider.exchange_code(code)?;
        attempt.advance(LoginState::TokenExchanged);

        let claims = extract_claims(&token)?;
        if claims.subject_id.is_empty() {
            return Err(LoginError::MissingSubject);
        }
        if claims.display_name.trim().is_empty() {
            return Err(LoginError::AccountProvisioning(
                "identity carries no display name".into(),
            ));
        }
        info!(
            subject_id = %claims.subject_id,
            display_name = %claims.display_name,
            expires_on = %claims.expires_on_display(),
            "identity asserted"
        );
        attempt.advance(LoginState::ClaimsExtracted);

        let affiliation = self.directory.resolve_affiliation(&claims.subject_id)?;
        attempt.advance(LoginState::AffiliationResolved);

        let decision = policy::evaluate(&claims, &affiliation, &self.config.allowlist);
        if !decision.granted {
            warn!(
                subject_id = %claims.subject_id,
                display_name = %claims.display_name,
                group_id_primary = %affiliation.group_id_primary,
                "identity is not on the allowlist"
            );
            return Err(LoginError::NotAuthorized {
                display_name: claims.display_name,
            });
        }
        debug!(reason = ?decision.reason, "identity authorized");
        attempt.advance(LoginState::Authorized);

        let account = provision(accounts, &claims)?;
        if let Some(previous) = session.user() {
            info!(previous = %previous, "logging out previous session user");
            session.logout();
        }
        let persistent = accounts
            .preference(&account, PERSIST_LOGIN_PREFERENCE)
            .is_some_and(|v| is_truthy(&v));
        session.set_user(&account, persistent);
        attempt.advance(LoginState::AccountBound);

        let now: DateTime<Utc> = self.clock.now();
        session.set_secret(LAST_LOGIN_SECRET, now.timestamp().to_string());

        let return_to = session.get(RETURN_TO_KEY);
        session.remove(RETURN_TO_KEY);
        let redirect_url = return_to
            .filter(|t| !t.trim().is_empty())
            .and_then(|t| pages.page_url(&t))
            .unwrap_or_else(|| pages.home_url());

        session.save();
        attempt.advance(LoginState::SessionEstablished);
        info!(account = %account.name, persistent, "session established");

        Ok(CompletedLogin {
            redirect_url,
            account,
            persistent,
            state: attempt.state,
        })
    }
}

/// Find the account named after the identity, creating it on first login.
fn provision(accounts: &dyn AccountStore, claims: &IdentityClaims) -> Result<Account, LoginError> {
    let name = AccountName::parse(&claims.display_name)
        .map_err(|e| LoginError::AccountProvisioning(e.to_string()))?;

    let existing = accounts
        .find_by_name(&name)
        .map_err(|e| LoginError::AccountProvisioning(e.to_string()))?;
    if let Some(account) = existing {
        debug!(account = %account.name, "reusing existing account");
        return Ok(account);
    }

    let account = accounts
        .create_account(&name, &claims.display_name)
        .map_err(|e| LoginError::AccountProvisioning(e.to_string()))?;
    info!(account = %account.name, subject_id = %claims.subject_id, "account created");
    Ok(account)
}
