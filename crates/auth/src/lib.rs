//! `ssogate-auth` — SSO login engine.
//!
//! This crate is decoupled from HTTP frameworks and storage: the network,
//! the session and the account store are reached through traits the host
//! implements (`HttpTransport`, `SessionStore`, `AccountStore`, `PageResolver`).

pub mod account;
pub mod claims;
pub mod config;
pub mod directory;
pub mod error;
pub mod flow;
pub mod http;
pub mod policy;
pub mod provider;
pub mod session;
pub mod stepup;

pub use account::{Account, AccountName, AccountStore, AccountStoreError, PageResolver};
pub use claims::{IdentityClaims, extract_claims, extract_claims_from_jwt};
pub use config::{AllowlistConfig, ConfigError, ProviderEndpoints, SsoConfig, StepUpConfig};
pub use directory::{AffiliationRecord, DirectoryClient};
pub use error::{ErrorKind, LoginError};
pub use flow::{CallbackParams, CompletedLogin, LoginFailure, LoginFlow, LoginRedirect, LoginState};
pub use http::{HttpResponse, HttpTransport, RequestBody, TransportError};
pub use policy::{AuthorizationDecision, DecisionReason, evaluate, is_authorized};
pub use provider::{AccessToken, AuthorizationState, ProviderClient};
pub use session::SessionStore;
pub use stepup::StepUpStatus;
