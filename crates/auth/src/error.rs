//! Login error taxonomy.
//!
//! Every component returns a typed `LoginError`; the flow decides what the
//! user gets to see via [`LoginError::user_message`].

use serde::Serialize;
use thiserror::Error;

/// Terminal failure of one login attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// Network or I/O failure talking to the provider or the directory service.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with an explicit OAuth error.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("identity carries no subject id")]
    MissingSubject,

    #[error("ambiguous identity: {0}")]
    AmbiguousIdentity(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("'{display_name}' is not authorized")]
    NotAuthorized { display_name: String },

    #[error("account provisioning failed: {0}")]
    AccountProvisioning(String),

    /// Callback `state` missing or different from the one issued at redirect.
    #[error("authorization state mismatch")]
    StateMismatch,

    #[error("callback carries no authorization code")]
    MissingAuthorizationCode,

    #[error("could not generate authorization state: {0}")]
    StateGeneration(String),
}

/// Discriminant of [`LoginError`], cheap to copy into state machines and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Provider,
    MalformedToken,
    MissingSubject,
    AmbiguousIdentity,
    MalformedResponse,
    NotAuthorized,
    AccountProvisioning,
    StateMismatch,
    MissingAuthorizationCode,
    StateGeneration,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Provider => "provider",
            ErrorKind::MalformedToken => "malformed_token",
            ErrorKind::MissingSubject => "missing_subject",
            ErrorKind::AmbiguousIdentity => "ambiguous_identity",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::NotAuthorized => "not_authorized",
            ErrorKind::AccountProvisioning => "account_provisioning",
            ErrorKind::StateMismatch => "state_mismatch",
            ErrorKind::MissingAuthorizationCode => "missing_authorization_code",
            ErrorKind::StateGeneration => "state_generation",
        };
        f.write_str(s)
    }
}

impl LoginError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoginError::Transport(_) => ErrorKind::Transport,
            LoginError::Provider(_) => ErrorKind::Provider,
            LoginError::MalformedToken(_) => ErrorKind::MalformedToken,
            LoginError::MissingSubject => ErrorKind::MissingSubject,
            LoginError::AmbiguousIdentity(_) => ErrorKind::AmbiguousIdentity,
            LoginError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            LoginError::NotAuthorized { .. } => ErrorKind::NotAuthorized,
            LoginError::AccountProvisioning(_) => ErrorKind::AccountProvisioning,
            LoginError::StateMismatch => ErrorKind::StateMismatch,
            LoginError::MissingAuthorizationCode => ErrorKind::MissingAuthorizationCode,
            LoginError::StateGeneration(_) => ErrorKind::StateGeneration,
        }
    }

    /// Text for the error page rendered by the glue layer.
    ///
    /// Internal details (raw responses, subject ids) stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            LoginError::Transport(_)
            | LoginError::MalformedToken(_)
            | LoginError::MissingSubject
            | LoginError::AmbiguousIdentity(_)
            | LoginError::MalformedResponse(_) => {
                "Unable to retrieve character information. Please try again later".to_string()
            }
            LoginError::Provider(msg) => format!("Retrieving access token failed: {msg}"),
            LoginError::NotAuthorized { display_name } => format!(
                "The character that you authenticated ({display_name}) is not authorized to view this site"
            ),
            LoginError::AccountProvisioning(msg) => {
                format!("Could not create a local account for this character: {msg}")
            }
            LoginError::StateMismatch | LoginError::MissingAuthorizationCode => {
                "The login request is invalid or has expired. Please start again".to_string()
            }
            LoginError::StateGeneration(_) => {
                "Unable to start the login. Please try again later".to_string()
            }
        }
    }
}
