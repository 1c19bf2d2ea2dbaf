//! Write path: append an id to the persisted record.

use tracing::debug;

use crate::error::{RegistryError, RegistryResult};

use super::{load, AuthorizationRegistry};

/// Returns `true` when the record was rewritten.
pub(crate) async fn record_impl(registry: &AuthorizationRegistry, id: &str) -> RegistryResult<bool> {
    let mut set = load::load_for_update_impl(registry).await?;

    if !set.insert(id) {
        debug!(id, "authorization already recorded");
        return Ok(false);
    }

    let path = registry.config.store_path.as_str();
    let bytes = set.to_json().map_err(|e| RegistryError::Parse {
        path: path.to_string(),
        message: format!("failed to serialize authorization record: {}", e),
    })?;

    registry.transport.write_remote_file(path, &bytes).await?;

    debug!(id, path, entries = set.len(), "persisted authorization record");
    Ok(true)
}
