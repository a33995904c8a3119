//! SSO configuration.
//!
//! Built once at startup and handed to the components that need it; nothing in
//! the engine reads process-wide settings on its own.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use ssogate_core::{GroupId, SubjectId};

pub const DEFAULT_AUTHORIZE_URL: &str = "https://login.eveonline.com/v2/oauth/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://login.eveonline.com/v2/oauth/token";
pub const DEFAULT_AFFILIATION_URL: &str = "https://esi.evetech.net/latest/characters/affiliation/";

/// Placeholder shown wherever a credential would otherwise be displayed.
pub const REDACTED: &str = "*******";

const ENV_PREFIX: &str = "SSOGATE_";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    Missing(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// OAuth2 client credentials.
///
/// Serializing always masks the secret; `Debug` does too.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientCredentials {
    pub id: String,
    #[serde(serialize_with = "mask")]
    pub secret: String,
}

fn mask<S: Serializer>(_: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(REDACTED)
}

impl core::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("id", &self.id)
            .field("secret", &REDACTED)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub affiliation_url: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: DEFAULT_AUTHORIZE_URL.to_owned(),
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            affiliation_url: DEFAULT_AFFILIATION_URL.to_owned(),
        }
    }
}

/// Who may log in. All sets empty means everybody.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllowlistConfig {
    #[serde(alias = "allowed_character_ids")]
    pub allowed_subject_ids: BTreeSet<SubjectId>,

    #[serde(alias = "allowed_corporation_ids")]
    pub allowed_group_ids_primary: BTreeSet<GroupId>,

    #[serde(alias = "allowed_alliance_ids")]
    pub allowed_group_ids_secondary: BTreeSet<GroupId>,
}

impl AllowlistConfig {
    pub fn is_empty(&self) -> bool {
        self.allowed_subject_ids.is_empty()
            && self.allowed_group_ids_primary.is_empty()
            && self.allowed_group_ids_secondary.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepUpConfig {
    /// Operation names that require a recent login.
    pub sensitive_operations: BTreeSet<String>,

    /// Freshness window in seconds.
    pub window_secs: u64,
}

impl Default for StepUpConfig {
    fn default() -> Self {
        Self {
            sensitive_operations: BTreeSet::from(["ChangeEmail".to_owned()]),
            window_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SsoConfig {
    pub client: ClientCredentials,

    /// Callback URL registered with the provider.
    pub redirect_uri: String,

    #[serde(default)]
    pub endpoints: ProviderEndpoints,

    /// Requested scopes; the provider's minimum (none) by default.
    #[serde(default)]
    pub scopes: Vec<String>,

    #[serde(default)]
    pub allowlist: AllowlistConfig,

    #[serde(default)]
    pub step_up: StepUpConfig,
}

impl SsoConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client: ClientCredentials {
                id: client_id.into(),
                secret: client_secret.into(),
            },
            redirect_uri: redirect_uri.into(),
            endpoints: ProviderEndpoints::default(),
            scopes: Vec::new(),
            allowlist: AllowlistConfig::default(),
            step_up: StepUpConfig::default(),
        }
    }

    pub fn with_allowlist(mut self, allowlist: AllowlistConfig) -> Self {
        self.allowlist = allowlist;
        self
    }

    pub fn with_endpoints(mut self, endpoints: ProviderEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `SSOGATE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key/value source using the `SSOGATE_*` names.
    ///
    /// Id lists are comma separated, scopes are space separated.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let require = |name: &str| {
            get(name).ok_or_else(|| ConfigError::Missing(format!("{ENV_PREFIX}{name}")))
        };

        let mut config = Self::new(
            require("CLIENT_ID")?,
            require("CLIENT_SECRET")?,
            require("REDIRECT_URI")?,
        );

        let defaults = ProviderEndpoints::default();
        config.endpoints = ProviderEndpoints {
            authorize_url: get("AUTHORIZE_URL").unwrap_or(defaults.authorize_url),
            token_url: get("TOKEN_URL").unwrap_or(defaults.token_url),
            affiliation_url: get("AFFILIATION_URL").unwrap_or(defaults.affiliation_url),
        };

        if let Some(scopes) = get("SCOPES") {
            config.scopes = scopes.split_whitespace().map(str::to_owned).collect();
        }

        config.allowlist = AllowlistConfig {
            allowed_subject_ids: id_list(get("ALLOWED_SUBJECT_IDS")),
            allowed_group_ids_primary: id_list(get("ALLOWED_GROUP_IDS_PRIMARY")),
            allowed_group_ids_secondary: id_list(get("ALLOWED_GROUP_IDS_SECONDARY")),
        };

        if let Some(window) = get("STEP_UP_WINDOW_SECS") {
            config.step_up.window_secs = window.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_PREFIX}STEP_UP_WINDOW_SECS: '{window}'"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client.id.trim().is_empty() {
            return Err(ConfigError::Invalid("client id is empty".into()));
        }
        if self.client.secret.is_empty() {
            return Err(ConfigError::Invalid("client secret is empty".into()));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(ConfigError::Invalid("redirect uri is empty".into()));
        }
        if self.step_up.window_secs == 0 {
            return Err(ConfigError::Invalid("step-up window must be positive".into()));
        }
        Ok(())
    }

    /// Copy safe to show to administrators: client id and secret masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.client = ClientCredentials {
            id: REDACTED.to_owned(),
            secret: REDACTED.to_owned(),
        };
        copy
    }

    pub fn display_json(&self) -> serde_json::Value {
        serde_json::to_value(self.redacted()).unwrap_or_default()
    }
}

fn id_list<T: From<String> + Ord>(raw: Option<String>) -> BTreeSet<T> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| T::from(id.to_owned()))
            .collect()
    })
    .unwrap_or_default()
}
