//! Affiliation lookup against the remote directory service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use tracing::{debug, error};

use ssogate_core::{GroupId, SubjectId};

use crate::error::LoginError;
use crate::http::{HttpTransport, RequestBody};

/// Current group memberships of one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffiliationRecord {
    pub subject_id: SubjectId,
    /// Corporation.
    pub group_id_primary: GroupId,
    /// Alliance, when the corporation belongs to one.
    pub group_id_secondary: Option<GroupId>,
    pub faction_id: Option<GroupId>,
}

#[derive(Debug, Deserialize)]
struct AffiliationEntry {
    corporation_id: GroupId,
    #[serde(default)]
    alliance_id: Option<GroupId>,
    #[serde(default)]
    faction_id: Option<GroupId>,
}

pub struct DirectoryClient {
    endpoint: String,
    transport: Arc<dyn HttpTransport>,
}

impl DirectoryClient {
    pub fn new(endpoint: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }

    /// Resolve the single affiliation record for `subject_id`.
    ///
    /// The service answers batch lookups; anything other than exactly one
    /// entry for our one id is treated as an ambiguous identity.
    pub fn resolve_affiliation(
        &self,
        subject_id: &SubjectId,
    ) -> Result<AffiliationRecord, LoginError> {
        if subject_id.is_empty() {
            return Err(LoginError::MissingSubject);
        }

        let id = subject_id
            .as_i64()
            .map_or_else(|| json!(subject_id.as_str()), |n| json!(n));
        let response = self
            .transport
            .post(&self.endpoint, &RequestBody::Json(json!([id])))
            .map_err(|e| {
                error!(subject_id = %subject_id, error = %e, "affiliation lookup failed");
                LoginError::Transport(e.to_string())
            })?;

        if !response.is_success() {
            error!(subject_id = %subject_id, status = response.status, body = %response.body, "affiliation lookup rejected");
            return Err(LoginError::Transport(format!(
                "directory service responded with HTTP {}",
                response.status
            )));
        }

        let Ok(JsonValue::Array(mut entries)) = response.json() else {
            error!(subject_id = %subject_id, body = %response.body, "affiliation response is not an array");
            return Err(LoginError::MalformedResponse(
                "affiliation response is not an array".into(),
            ));
        };

        match entries.len() {
            1 => {}
            0 => {
                error!(subject_id = %subject_id, "no affiliation found");
                return Err(LoginError::AmbiguousIdentity("no affiliation found".into()));
            }
            count => {
                error!(subject_id = %subject_id, count, body = %response.body, "multiple affiliations found");
                return Err(LoginError::AmbiguousIdentity(
                    "multiple affiliations found".into(),
                ));
            }
        }

        let entry = entries.remove(0);
        if !entry.is_object() {
            error!(subject_id = %subject_id, entry = %entry, "invalid affiliation entry");
            return Err(LoginError::MalformedResponse(
                "affiliation entry is not an object".into(),
            ));
        }

        let entry: AffiliationEntry = serde_json::from_value(entry).map_err(|e| {
            error!(subject_id = %subject_id, error = %e, "invalid affiliation entry");
            LoginError::MalformedResponse(format!("affiliation entry: {e}"))
        })?;

        let record = AffiliationRecord {
            subject_id: subject_id.clone(),
            group_id_primary: entry.corporation_id,
            group_id_secondary: entry.alliance_id,
            faction_id: entry.faction_id,
        };
        debug!(?record, "affiliation resolved");
        Ok(record)
    }
}
