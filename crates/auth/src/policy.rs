//! Allowlist authorization.
//!
//! - No IO
//! - No panics
//! - Pure policy check over an already enriched identity

use serde::Serialize;

use crate::claims::IdentityClaims;
use crate::config::AllowlistConfig;
use crate::directory::AffiliationRecord;

/// Which rule decided the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// No allowlist configured.
    AllowAll,
    SubjectListed,
    PrimaryGroupListed,
    SecondaryGroupListed,
    NotListed,
}

/// Outcome of an allowlist evaluation, kept for the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthorizationDecision {
    pub granted: bool,
    pub reason: DecisionReason,
}

impl AuthorizationDecision {
    fn grant(reason: DecisionReason) -> Self {
        Self {
            granted: true,
            reason,
        }
    }
}

/// Evaluate the allowlist and say why.
///
/// Subject ids are checked first, then the primary group, then the secondary
/// group; the first hit wins.
pub fn evaluate(
    claims: &IdentityClaims,
    affiliation: &AffiliationRecord,
    allowlist: &AllowlistConfig,
) -> AuthorizationDecision {
    if allowlist.is_empty() {
        return AuthorizationDecision::grant(DecisionReason::AllowAll);
    }

    if allowlist.allowed_subject_ids.contains(&claims.subject_id) {
        return AuthorizationDecision::grant(DecisionReason::SubjectListed);
    }

    if allowlist
        .allowed_group_ids_primary
        .contains(&affiliation.group_id_primary)
    {
        return AuthorizationDecision::grant(DecisionReason::PrimaryGroupListed);
    }

    if affiliation
        .group_id_secondary
        .as_ref()
        .is_some_and(|g| allowlist.allowed_group_ids_secondary.contains(g))
    {
        return AuthorizationDecision::grant(DecisionReason::SecondaryGroupListed);
    }

    AuthorizationDecision {
        granted: false,
        reason: DecisionReason::NotListed,
    }
}

pub fn is_authorized(
    claims: &IdentityClaims,
    affiliation: &AffiliationRecord,
    allowlist: &AllowlistConfig,
) -> bool {
    evaluate(claims, affiliation, allowlist).granted
}
