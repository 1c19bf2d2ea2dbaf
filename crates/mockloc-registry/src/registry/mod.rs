//! Mock-location authorization registry.
//!
//! Grants and revokes mock-location access on the device and keeps a
//! best-effort record of every id it granted, so a later reset can revoke
//! exactly those ids that are still installed.
//!
//! # Record
//!
//! ```text
//! /data/local/tmp/mock_apps.json   # ["com.example.a","com.example.b"]
//! ```
//!
//! The record is bookkeeping only. Failing to read or write it never fails
//! a grant, and a reset never fails at all. Stale ids (uninstalled packages)
//! stay in the record; they are filtered against the installed set at reset
//! time. Concurrent `authorize` calls are not serialized, so one of two racing
//! writes may be lost.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::transport::AuthorizationTransport;
use crate::types::{AuthorizationSet, RegistryConfig};

mod load;
mod persist;
mod reconcile;

pub use reconcile::{DeauthorizeReport, RevokeOutcome};

/// Registry of mock-location authorizations on one device.
#[derive(Debug, Clone)]
pub struct AuthorizationRegistry {
    transport: Arc<dyn AuthorizationTransport>,
    config: RegistryConfig,
}

impl AuthorizationRegistry {
    pub fn new(transport: Arc<dyn AuthorizationTransport>, config: RegistryConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn AuthorizationTransport> {
        &self.transport
    }

    /// Grant mock-location access to `id` and record it.
    ///
    /// Only the grant can fail this call. Recording happens after a
    /// successful grant and its failures are logged.
    pub async fn authorize(&self, id: &str) -> RegistryResult<()> {
        if id.is_empty() {
            return Err(RegistryError::InvalidIdentifier { id: id.to_string() });
        }

        self.transport.grant(id).await?;
        debug!(id, "granted mock location");

        if let Err(e) = persist::record_impl(self, id).await {
            warn!(id, error = %e, "unable to persist mock location app id");
        }

        Ok(())
    }

    /// Revoke mock-location access from every recorded id that is still
    /// installed. Never fails; outcomes are logged.
    pub async fn deauthorize_all(&self) {
        let report = self.deauthorize_all_report().await;
        debug!(
            revoked = report.revoked().len(),
            failed = report.failed().len(),
            "mock location reset finished"
        );
    }

    /// Same as [`deauthorize_all`](Self::deauthorize_all), returning what happened.
    pub async fn deauthorize_all_report(&self) -> DeauthorizeReport {
        reconcile::deauthorize_all_impl(self).await
    }

    /// Current record; absent or unreadable records read as empty.
    pub async fn authorized_ids(&self) -> AuthorizationSet {
        load::load_or_empty_impl(self).await
    }
}
