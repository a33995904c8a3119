//! JWT access-token claim extraction.

use base64::Engine;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use ssogate_core::SubjectId;

use crate::error::LoginError;
use crate::provider::AccessToken;

/// Layout used when an expiry is rendered for people.
pub const EXPIRES_ON_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Identity asserted by the provider's JWT access token.
///
/// Claims are read from the payload only. The token signature is **not**
/// verified here: tokens reach this type straight from the provider's token
/// endpoint over TLS, and that channel is the trust boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityClaims {
    /// Third `:`-separated component of `sub` (`CHARACTER:EVE:<id>`).
    pub subject_id: SubjectId,

    /// `name`; doubles as the local account name.
    pub display_name: String,

    /// `owner`; changes when the character is transferred to another account.
    pub owner_hash: String,

    /// `exp`, as a UTC wall-clock time without offset.
    pub expires_on: NaiveDateTime,

    /// `scp`, which the provider sends as a string for a single scope.
    pub scopes: Vec<String>,
}

impl IdentityClaims {
    pub fn expires_on_display(&self) -> String {
        self.expires_on.format(EXPIRES_ON_FORMAT).to_string()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawClaims {
    name: String,
    sub: String,
    owner: String,
    /// NumericDate; RFC 7519 allows fractional seconds.
    exp: Option<serde_json::Number>,
    scp: ScopeClaim,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum ScopeClaim {
    #[default]
    Absent,
    One(String),
    Many(Vec<String>),
}

impl ScopeClaim {
    fn into_vec(self) -> Vec<String> {
        match self {
            ScopeClaim::Absent => Vec::new(),
            ScopeClaim::One(s) if s.is_empty() => Vec::new(),
            ScopeClaim::One(s) => vec![s],
            ScopeClaim::Many(v) => v,
        }
    }
}

pub fn extract_claims(token: &AccessToken) -> Result<IdentityClaims, LoginError> {
    extract_claims_from_jwt(token.secret())
}

/// Decode the payload segment of a JWT into [`IdentityClaims`].
///
/// Absent claims default to empty values. Whether an empty subject is
/// acceptable is the caller's decision.
pub fn extract_claims_from_jwt(jwt: &str) -> Result<IdentityClaims, LoginError> {
    let payload = jwt
        .split('.')
        .nth(1)
        .ok_or_else(|| LoginError::MalformedToken("missing payload segment".into()))?;

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| LoginError::MalformedToken("payload is not valid base64url".into()))?;

    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|_| LoginError::MalformedToken("payload is not a JSON object".into()))?;
    if !value.is_object() {
        return Err(LoginError::MalformedToken(
            "payload is not a JSON object".into(),
        ));
    }

    let raw: RawClaims = serde_json::from_value(value)
        .map_err(|e| LoginError::MalformedToken(format!("unexpected claim type: {e}")))?;

    let expires_on = expires_on(raw.exp.as_ref())?;

    Ok(IdentityClaims {
        subject_id: SubjectId::new(raw.sub.split(':').nth(2).unwrap_or_default()),
        display_name: raw.name,
        owner_hash: raw.owner,
        expires_on,
        scopes: raw.scp.into_vec(),
    })
}

/// Whole seconds of `exp`, truncated toward zero. Absent means the epoch.
fn expires_on(exp: Option<&serde_json::Number>) -> Result<NaiveDateTime, LoginError> {
    let Some(exp) = exp else {
        return Ok(NaiveDateTime::default());
    };
    let seconds = exp
        .as_i64()
        .or_else(|| exp.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64));
    seconds
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| LoginError::MalformedToken(format!("exp {exp} is out of range")))
}
