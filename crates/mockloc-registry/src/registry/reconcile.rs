//! Reset path: revoke every recorded id that is still installed.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::transport::AuthorizationTransport;

use super::{load, AuthorizationRegistry};

/// Result of a single revoke call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked(String),
    Failed { id: String, message: String },
}

impl RevokeOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Revoked(id) => id,
            Self::Failed { id, .. } => id,
        }
    }

    pub fn is_revoked(&self) -> bool {
        matches!(self, Self::Revoked(_))
    }
}

/// What a reset attempted and how each call ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeauthorizeReport {
    /// Recorded ids that are still installed.
    pub candidates: Vec<String>,

    /// One entry per revoke call, in candidate order.
    pub outcomes: Vec<RevokeOutcome>,
}

impl DeauthorizeReport {
    pub fn revoked(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_revoked())
            .map(RevokeOutcome::id)
            .collect()
    }

    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_revoked())
            .map(RevokeOutcome::id)
            .collect()
    }
}

pub(crate) async fn deauthorize_all_impl(registry: &AuthorizationRegistry) -> DeauthorizeReport {
    // One switch for the whole device: a single revoke resets everything.
    match registry.transport.uses_global_toggle().await {
        Ok(true) => {
            debug!("device uses a global mock location switch");
            let target = registry.config.fallback_id.clone();
            let outcome = revoke_one(Arc::clone(&registry.transport), target).await;
            return DeauthorizeReport {
                candidates: Vec::new(),
                outcomes: vec![outcome],
            };
        }
        Ok(false) => {}
        Err(e) => warn!(error = %e, "unable to determine authorization mode, revoking per id"),
    }

    let (reference, recorded) = tokio::join!(
        reference_or_empty(registry.transport.as_ref()),
        load::load_or_empty_impl(registry)
    );

    let candidates = recorded.intersection(&reference);
    debug!(
        recorded = recorded.len(),
        installed = reference.len(),
        candidates = candidates.len(),
        "computed mock location reset candidates"
    );

    // At most one candidate: a single call, falling back to the helper id so
    // the device always ends in a known state.
    if candidates.len() <= 1 {
        let target = candidates
            .first()
            .cloned()
            .unwrap_or_else(|| registry.config.fallback_id.clone());
        let outcome = revoke_one(Arc::clone(&registry.transport), target).await;
        return DeauthorizeReport {
            candidates,
            outcomes: vec![outcome],
        };
    }

    debug!(ids = ?candidates, "resetting mock_location permission");

    let mut join_set = JoinSet::new();
    for id in &candidates {
        join_set.spawn(revoke_one(Arc::clone(&registry.transport), id.clone()));
    }

    let mut outcomes = Vec::with_capacity(candidates.len());
    while let Some(res) = join_set.join_next().await {
        match res {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => warn!(error = %e, "revoke task did not complete"),
        }
    }

    // Tasks that never reported (panicked or cancelled) count as failures.
    for id in &candidates {
        if !outcomes.iter().any(|o| o.id() == id) {
            outcomes.push(RevokeOutcome::Failed {
                id: id.clone(),
                message: "revoke task did not complete".to_string(),
            });
        }
    }
    outcomes.sort_by_key(|o| candidates.iter().position(|c| c == o.id()));

    DeauthorizeReport {
        candidates,
        outcomes,
    }
}

async fn reference_or_empty(transport: &dyn AuthorizationTransport) -> Vec<String> {
    match transport.list_reference_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "unable to list installed packages");
            Vec::new()
        }
    }
}

async fn revoke_one(transport: Arc<dyn AuthorizationTransport>, id: String) -> RevokeOutcome {
    match transport.revoke(&id).await {
        Ok(()) => {
            debug!(id = %id, "revoked mock location");
            RevokeOutcome::Revoked(id)
        }
        Err(e) => {
            warn!(id = %id, error = %e, "unable to revoke mock location");
            RevokeOutcome::Failed {
                id,
                message: e.to_string(),
            }
        }
    }
}
