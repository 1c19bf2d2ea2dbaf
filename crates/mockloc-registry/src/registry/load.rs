//! Read path for the persisted authorization record.

use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::types::AuthorizationSet;

use super::AuthorizationRegistry;

pub(crate) async fn load_impl(registry: &AuthorizationRegistry) -> RegistryResult<AuthorizationSet> {
    let path = registry.config.store_path.as_str();
    let bytes = registry.transport.read_remote_file(path).await?;

    AuthorizationSet::from_json(&bytes).map_err(|e| RegistryError::Parse {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Load for a read-modify-write. Absent or corrupt records start empty;
/// transport failures propagate so an unreadable record is never clobbered.
pub(crate) async fn load_for_update_impl(
    registry: &AuthorizationRegistry,
) -> RegistryResult<AuthorizationSet> {
    match load_impl(registry).await {
        Ok(set) => Ok(set),
        Err(e) if e.is_absent() => {
            debug!(
                path = %registry.config.store_path,
                reason = %e,
                "starting a new authorization record"
            );
            Ok(AuthorizationSet::new())
        }
        Err(e) => Err(e),
    }
}

/// Load for reporting and reconciliation; every failure reads as empty.
pub(crate) async fn load_or_empty_impl(registry: &AuthorizationRegistry) -> AuthorizationSet {
    match load_impl(registry).await {
        Ok(set) => set,
        Err(RegistryError::NotFound { path }) => {
            debug!(path = %path, "no authorization record on device");
            AuthorizationSet::new()
        }
        Err(e) => {
            warn!(
                path = %registry.config.store_path,
                error = %e,
                "ignoring unreadable authorization record"
            );
            AuthorizationSet::new()
        }
    }
}
