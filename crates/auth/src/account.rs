//! Local accounts bound to external identities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ssogate_core::{AccountId, DomainError, DomainResult};

/// Account preference that selects a persistent login cookie.
pub const PERSIST_LOGIN_PREFERENCE: &str = "ssogate-persist";

const MAX_NAME_BYTES: usize = 255;
const FORBIDDEN_NAME_CHARS: &[char] = &['#', '<', '>', '[', ']', '|', '{', '}', '/', '@', ':'];

/// Local username. Equal to the provider's display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    /// Validate a display name as a local username.
    ///
    /// Surrounding whitespace is dropped; characters the host application
    /// reserves for link and namespace syntax are rejected.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(DomainError::validation("account name cannot be empty"));
        }
        if name.len() > MAX_NAME_BYTES {
            return Err(DomainError::validation(format!(
                "account name exceeds {MAX_NAME_BYTES} bytes"
            )));
        }
        if let Some(c) = name
            .chars()
            .find(|c| c.is_control() || FORBIDDEN_NAME_CHARS.contains(c))
        {
            return Err(DomainError::validation(format!(
                "account name contains forbidden character {c:?}"
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for AccountName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: AccountName,
    /// Display metadata, set from the claims when the account is created.
    pub real_name: String,
    /// External-identity accounts are created without one.
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Account for an identity that only ever authenticates through SSO.
    pub fn external(name: AccountName, real_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            name,
            real_name: real_name.into(),
            has_password: false,
            created_at: now,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountStoreError {
    #[error("invalid account: {0}")]
    Invalid(#[from] DomainError),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Local account store.
///
/// Shared across requests. `create_account` must be create-if-absent: two
/// concurrent first logins for one name end up with the same account.
pub trait AccountStore: Send + Sync {
    fn find_by_name(&self, name: &AccountName) -> Result<Option<Account>, AccountStoreError>;

    fn create_account(
        &self,
        name: &AccountName,
        real_name: &str,
    ) -> Result<Account, AccountStoreError>;

    fn preference(&self, account: &Account, key: &str) -> Option<String>;
}

/// Resolves post-login redirect targets.
pub trait PageResolver {
    /// Full URL of an existing page, `None` for unknown or invalid titles.
    fn page_url(&self, title: &str) -> Option<String>;

    /// Landing page used when there is nowhere better to go.
    fn home_url(&self) -> String;
}

/// Toggle preferences are stored as strings by most hosts.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
