//! In-memory transport.
//!
//! Stands in for a device in tests and in hosts that keep authorization state
//! themselves. Records every call and can be told to fail specific ones.

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{RegistryError, RegistryResult};
use crate::transport::AuthorizationTransport;

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<String, Vec<u8>>,
    installed: Vec<String>,
    active: BTreeSet<String>,
    grant_calls: Vec<String>,
    revoke_calls: Vec<String>,
    write_calls: usize,
    fail_grant: HashSet<String>,
    fail_revoke: HashSet<String>,
    fail_reads: bool,
    fail_writes: bool,
    fail_listing: bool,
    global_toggle: bool,
}

/// Transport backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: Mutex<MemoryState>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the installed (reference) ids.
    pub fn with_installed<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.get_mut().installed = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Seed a remote file.
    pub fn with_file(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.state.get_mut().files.insert(path.into(), bytes.into());
        self
    }

    pub fn failing_grant(mut self, id: impl Into<String>) -> Self {
        self.state.get_mut().fail_grant.insert(id.into());
        self
    }

    pub fn failing_revoke(mut self, id: impl Into<String>) -> Self {
        self.state.get_mut().fail_revoke.insert(id.into());
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.state.get_mut().fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.state.get_mut().fail_writes = true;
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.state.get_mut().fail_listing = true;
        self
    }

    /// Behave like a device with one global authorization switch.
    pub fn with_global_toggle(mut self) -> Self {
        self.state.get_mut().global_toggle = true;
        self
    }

    /// Replace the installed ids at runtime.
    pub async fn set_installed(&self, ids: Vec<String>) {
        self.state.lock().await.installed = ids;
    }

    pub async fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().await.files.get(path).cloned()
    }

    pub async fn grant_calls(&self) -> Vec<String> {
        self.state.lock().await.grant_calls.clone()
    }

    pub async fn revoke_calls(&self) -> Vec<String> {
        self.state.lock().await.revoke_calls.clone()
    }

    pub async fn write_calls(&self) -> usize {
        self.state.lock().await.write_calls
    }

    /// Ids currently holding a grant.
    pub async fn active_grants(&self) -> Vec<String> {
        self.state.lock().await.active.iter().cloned().collect()
    }
}

fn injected(operation: &str, target: &str) -> RegistryError {
    RegistryError::Transport {
        message: format!("injected {} failure for {}", operation, target),
    }
}

#[async_trait]
impl AuthorizationTransport for MemoryTransport {
    async fn grant(&self, id: &str) -> RegistryResult<()> {
        let mut state = self.state.lock().await;
        state.grant_calls.push(id.to_string());
        if state.fail_grant.contains(id) {
            return Err(injected("grant", id));
        }
        state.active.insert(id.to_string());
        Ok(())
    }

    async fn revoke(&self, id: &str) -> RegistryResult<()> {
        let mut state = self.state.lock().await;
        state.revoke_calls.push(id.to_string());
        if state.fail_revoke.contains(id) {
            return Err(injected("revoke", id));
        }
        if state.global_toggle {
            state.active.clear();
        } else {
            state.active.remove(id);
        }
        Ok(())
    }

    async fn read_remote_file(&self, path: &str) -> RegistryResult<Vec<u8>> {
        let state = self.state.lock().await;
        if state.fail_reads {
            return Err(injected("read", path));
        }
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                path: path.to_string(),
            })
    }

    async fn write_remote_file(&self, path: &str, bytes: &[u8]) -> RegistryResult<()> {
        let mut state = self.state.lock().await;
        state.write_calls += 1;
        if state.fail_writes {
            return Err(injected("write", path));
        }
        state.files.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn list_reference_ids(&self) -> RegistryResult<Vec<String>> {
        let state = self.state.lock().await;
        if state.fail_listing {
            return Err(injected("listing", "installed packages"));
        }
        Ok(state.installed.clone())
    }

    async fn uses_global_toggle(&self) -> RegistryResult<bool> {
        Ok(self.state.lock().await.global_toggle)
    }
}
