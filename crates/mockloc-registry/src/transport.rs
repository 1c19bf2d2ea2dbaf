//! Device capability consumed by the registry.

use async_trait::async_trait;

use crate::error::RegistryResult;

/// Remote side of the registry: authorization toggles, file access, and the
/// live reference set.
///
/// Implementations own all timeout behavior. The registry performs no retries.
#[async_trait]
pub trait AuthorizationTransport: Send + Sync + std::fmt::Debug {
    /// Allow `id` to provide mock locations.
    async fn grant(&self, id: &str) -> RegistryResult<()>;

    /// Withdraw the mock-location authorization for `id`.
    async fn revoke(&self, id: &str) -> RegistryResult<()>;

    /// Read a remote file. Fails with `RegistryError::NotFound` when absent.
    async fn read_remote_file(&self, path: &str) -> RegistryResult<Vec<u8>>;

    /// Replace a remote file.
    ///
    /// Must never leave a partially written file visible at `path`.
    async fn write_remote_file(&self, path: &str, bytes: &[u8]) -> RegistryResult<()>;

    /// Identifiers currently considered valid (installed third-party packages).
    async fn list_reference_ids(&self) -> RegistryResult<Vec<String>>;

    /// Whether the device has one global authorization switch instead of
    /// per-id grants. A single `revoke` then resets every id.
    async fn uses_global_toggle(&self) -> RegistryResult<bool> {
        Ok(false)
    }
}
