//! OAuth2 authorization-code client for the identity provider.

use std::sync::Arc;

use base64::Engine;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use subtle::ConstantTimeEq;
use tracing::{debug, error};

use crate::config::SsoConfig;
use crate::error::LoginError;
use crate::http::{HttpTransport, RequestBody};

/// Per-attempt CSRF token, round-tripped through the provider redirect.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationState(String);

impl AuthorizationState {
    /// 256 random bits, base64url without padding.
    pub fn generate() -> Result<Self, LoginError> {
        let mut buf = [0u8; 32];
        getrandom::getrandom(&mut buf).map_err(|e| LoginError::StateGeneration(e.to_string()))?;
        Ok(Self(
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf),
        ))
    }

    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact equality in constant time.
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl core::fmt::Debug for AuthorizationState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("AuthorizationState(..)")
    }
}

/// Bearer credential returned by the token endpoint.
///
/// Lives only for the request that obtained it.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    pub token_type: String,
    pub expires_in: Option<i64>,
    refresh_token: Option<String>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: "Bearer".to_owned(),
            expires_in: None,
            refresh_token: None,
        }
    }

    /// The raw bearer string (a JWT for this provider).
    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }
}

impl core::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_owned()
}

pub struct ProviderClient {
    config: Arc<SsoConfig>,
    transport: Arc<dyn HttpTransport>,
}

impl ProviderClient {
    pub fn new(config: Arc<SsoConfig>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    /// Authorization endpoint URL for the given state.
    pub fn authorization_url(&self, state: &AuthorizationState) -> String {
        let scope = self.config.scopes.join(" ");
        let separator = if self.config.endpoints.authorize_url.contains('?') {
            '&'
        } else {
            '?'
        };
        format!(
            "{}{}response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            self.config.endpoints.authorize_url,
            separator,
            urlencoding::encode(&self.config.client.id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&scope),
            urlencoding::encode(state.as_str()),
        )
    }

    /// Fresh state plus the URL that carries it. The caller persists the state.
    pub fn begin(&self) -> Result<(String, AuthorizationState), LoginError> {
        let state = AuthorizationState::generate()?;
        Ok((self.authorization_url(&state), state))
    }

    /// Trade an authorization code for an access token.
    pub fn exchange_code(&self, code: &str) -> Result<AccessToken, LoginError> {
        let body = RequestBody::Form(vec![
            ("grant_type".into(), "authorization_code".into()),
            ("code".into(), code.to_owned()),
            ("redirect_uri".into(), self.config.redirect_uri.clone()),
            ("client_id".into(), self.config.client.id.clone()),
            ("client_secret".into(), self.config.client.secret.clone()),
        ]);

        let url = &self.config.endpoints.token_url;
        let response = self.transport.post(url, &body).map_err(|e| {
            error!(url = %url, error = %e, "token endpoint request failed");
            LoginError::Transport(e.to_string())
        })?;

        let Ok(data) = response.json() else {
            error!(status = response.status, body = %response.body, "token endpoint returned non-JSON body");
            return Err(if response.is_success() {
                LoginError::MalformedResponse("token response is not JSON".into())
            } else {
                LoginError::Provider(format!(
                    "token endpoint responded with HTTP {}",
                    response.status
                ))
            });
        };

        if let Some(message) = provider_error_message(&data) {
            error!(status = response.status, body = %response.body, "provider rejected token request");
            return Err(LoginError::Provider(message));
        }

        if !response.is_success() {
            error!(status = response.status, body = %response.body, "token endpoint failed");
            return Err(LoginError::Provider(format!(
                "token endpoint responded with HTTP {}",
                response.status
            )));
        }

        let parsed: TokenResponse = serde_json::from_value(data).map_err(|e| {
            error!(error = %e, "token response has unexpected shape");
            LoginError::MalformedResponse("token response lacks access_token".into())
        })?;

        debug!(token_type = %parsed.token_type, expires_in = ?parsed.expires_in, "access token obtained");

        Ok(AccessToken {
            token: parsed.access_token,
            token_type: parsed.token_type,
            expires_in: parsed.expires_in,
            refresh_token: parsed.refresh_token,
        })
    }
}

/// `Error: {error}. {error_description}` when the body carries an OAuth error.
fn provider_error_message(data: &JsonValue) -> Option<String> {
    let error = data.get("error").filter(|v| !is_blank(v))?;
    let description = data
        .get("error_description")
        .filter(|v| !is_blank(v))
        .map(as_text)
        .unwrap_or_default();
    Some(
        format!("Error: {}. {}", as_text(error), description)
            .trim_end()
            .to_owned(),
    )
}

fn is_blank(v: &JsonValue) -> bool {
    match v {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Bool(b) => !b,
        _ => false,
    }
}

fn as_text(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
