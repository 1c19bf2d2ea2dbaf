//! Integration tests for AuthorizationRegistry.
//!
//! Uses MemoryTransport in place of a device. Covers idempotent authorize,
//! absent/corrupt records, persistence failures, and the reset fan-out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockloc_registry::{
    AuthorizationRegistry, AuthorizationSet, AuthorizationTransport, MemoryTransport,
    RegistryConfig, RegistryError, RegistryResult, RevokeOutcome, DEFAULT_FALLBACK_ID,
    DEFAULT_STORE_PATH,
};
use tokio::sync::Barrier;

/// Transport whose gated calls only return once two of them are in flight.
/// Sequential callers never get past the first gated call.
struct RendezvousTransport {
    barrier: Barrier,
    record: Vec<u8>,
    installed: Vec<String>,
    gate_revokes: bool,
    gate_fetches: bool,
}

impl RendezvousTransport {
    fn new(record: &str, installed: &[&str]) -> Self {
        Self {
            barrier: Barrier::new(2),
            record: record.as_bytes().to_vec(),
            installed: installed.iter().map(|id| id.to_string()).collect(),
            gate_revokes: false,
            gate_fetches: false,
        }
    }

    fn gating_revokes(mut self) -> Self {
        self.gate_revokes = true;
        self
    }

    fn gating_fetches(mut self) -> Self {
        self.gate_fetches = true;
        self
    }
}

impl std::fmt::Debug for RendezvousTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendezvousTransport")
            .field("installed", &self.installed)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthorizationTransport for RendezvousTransport {
    async fn grant(&self, _id: &str) -> RegistryResult<()> {
        Ok(())
    }

    async fn revoke(&self, _id: &str) -> RegistryResult<()> {
        if self.gate_revokes {
            self.barrier.wait().await;
        }
        Ok(())
    }

    async fn read_remote_file(&self, _path: &str) -> RegistryResult<Vec<u8>> {
        if self.gate_fetches {
            self.barrier.wait().await;
        }
        Ok(self.record.clone())
    }

    async fn write_remote_file(&self, _path: &str, _bytes: &[u8]) -> RegistryResult<()> {
        Ok(())
    }

    async fn list_reference_ids(&self) -> RegistryResult<Vec<String>> {
        if self.gate_fetches {
            self.barrier.wait().await;
        }
        Ok(self.installed.clone())
    }
}

fn registry_with(transport: &Arc<MemoryTransport>) -> AuthorizationRegistry {
    AuthorizationRegistry::new(transport.clone(), RegistryConfig::default())
}

async fn persisted(transport: &MemoryTransport) -> AuthorizationSet {
    let bytes = transport
        .file(DEFAULT_STORE_PATH)
        .await
        .expect("record should exist");
    AuthorizationSet::from_json(&bytes).expect("record should parse")
}

#[tokio::test]
async fn test_authorize_twice_records_once_grants_twice() {
    let transport = Arc::new(MemoryTransport::new());
    let registry = registry_with(&transport);

    registry.authorize("com.example.a").await.unwrap();
    registry.authorize("com.example.a").await.unwrap();

    assert_eq!(
        transport.grant_calls().await,
        vec!["com.example.a", "com.example.a"]
    );
    let set = persisted(&transport).await;
    assert_eq!(set.iter().collect::<Vec<_>>(), vec!["com.example.a"]);
    // Second call found the id and skipped the rewrite.
    assert_eq!(transport.write_calls().await, 1);
}

#[tokio::test]
async fn test_authorize_without_record_creates_it() {
    let transport = Arc::new(MemoryTransport::new());
    let registry = registry_with(&transport);

    registry.authorize("com.example.a").await.unwrap();

    assert_eq!(
        transport.file(DEFAULT_STORE_PATH).await.unwrap(),
        br#"["com.example.a"]"#.to_vec()
    );
}

#[tokio::test]
async fn test_authorize_overwrites_corrupt_record() {
    let transport =
        Arc::new(MemoryTransport::new().with_file(DEFAULT_STORE_PATH, "{not json"));
    let registry = registry_with(&transport);

    registry.authorize("com.example.a").await.unwrap();

    let set = persisted(&transport).await;
    assert_eq!(set.iter().collect::<Vec<_>>(), vec!["com.example.a"]);
}

#[tokio::test]
async fn test_authorize_appends_to_existing_record() {
    let transport = Arc::new(
        MemoryTransport::new().with_file(DEFAULT_STORE_PATH, r#"["com.example.a"]"#),
    );
    let registry = registry_with(&transport);

    registry.authorize("com.example.b").await.unwrap();

    let set = persisted(&transport).await;
    assert_eq!(
        set.iter().collect::<Vec<_>>(),
        vec!["com.example.a", "com.example.b"]
    );
}

#[tokio::test]
async fn test_grant_failure_propagates_and_skips_bookkeeping() {
    let transport = Arc::new(MemoryTransport::new().failing_grant("com.example.a"));
    let registry = registry_with(&transport);

    let err = registry.authorize("com.example.a").await.unwrap_err();

    assert!(matches!(err, RegistryError::Transport { .. }));
    assert_eq!(transport.write_calls().await, 0);
    assert!(transport.file(DEFAULT_STORE_PATH).await.is_none());
}

#[tokio::test]
async fn test_write_failure_does_not_fail_authorize() {
    let transport = Arc::new(MemoryTransport::new().failing_writes());
    let registry = registry_with(&transport);

    registry.authorize("com.example.a").await.unwrap();

    assert_eq!(transport.active_grants().await, vec!["com.example.a"]);
    assert_eq!(transport.write_calls().await, 1);
    assert!(transport.file(DEFAULT_STORE_PATH).await.is_none());
}

#[tokio::test]
async fn test_unreadable_record_is_not_clobbered() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_file(DEFAULT_STORE_PATH, r#"["com.example.a"]"#)
            .failing_reads(),
    );
    let registry = registry_with(&transport);

    registry.authorize("com.example.b").await.unwrap();

    assert_eq!(transport.write_calls().await, 0);
    assert_eq!(transport.active_grants().await, vec!["com.example.b"]);
}

#[tokio::test]
async fn test_empty_identifier_rejected() {
    let transport = Arc::new(MemoryTransport::new());
    let registry = registry_with(&transport);

    let err = registry.authorize("").await.unwrap_err();

    assert!(matches!(err, RegistryError::InvalidIdentifier { .. }));
    assert!(transport.grant_calls().await.is_empty());
}

#[tokio::test]
async fn test_reset_revokes_intersection_concurrently() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_file(DEFAULT_STORE_PATH, r#"["a","b","c"]"#)
            .with_installed(["b", "c", "d"]),
    );
    let registry = registry_with(&transport);

    let report = registry.deauthorize_all_report().await;

    assert_eq!(report.candidates, vec!["b", "c"]);
    assert_eq!(report.revoked(), vec!["b", "c"]);
    let mut calls = transport.revoke_calls().await;
    calls.sort();
    assert_eq!(calls, vec!["b", "c"]);
}

#[tokio::test]
async fn test_reset_without_record_revokes_fallback() {
    let transport = Arc::new(MemoryTransport::new().with_installed(["com.example.x"]));
    let registry = registry_with(&transport);

    let report = registry.deauthorize_all_report().await;

    assert!(report.candidates.is_empty());
    assert_eq!(transport.revoke_calls().await, vec![DEFAULT_FALLBACK_ID]);
}

#[tokio::test]
async fn test_reset_uses_configured_fallback() {
    let transport = Arc::new(MemoryTransport::new());
    let registry = AuthorizationRegistry::new(
        transport.clone(),
        RegistryConfig::default().with_fallback_id("com.example.helper"),
    );

    registry.deauthorize_all().await;

    assert_eq!(transport.revoke_calls().await, vec!["com.example.helper"]);
}

#[tokio::test]
async fn test_reset_partial_failure_is_isolated() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_file(DEFAULT_STORE_PATH, r#"["b","c"]"#)
            .with_installed(["b", "c"])
            .failing_revoke("b"),
    );
    let registry = registry_with(&transport);
    registry.authorize("c").await.unwrap();

    let report = registry.deauthorize_all_report().await;

    assert_eq!(report.revoked(), vec!["c"]);
    assert_eq!(report.failed(), vec!["b"]);
    assert!(matches!(
        &report.outcomes[0],
        RevokeOutcome::Failed { id, .. } if id == "b"
    ));
    assert!(transport.active_grants().await.is_empty());
}

#[tokio::test]
async fn test_reset_skips_uninstalled_ids() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_file(DEFAULT_STORE_PATH, r#"["com.a","com.b"]"#)
            .with_installed(["com.a", "com.x"]),
    );
    let registry = registry_with(&transport);

    registry.deauthorize_all().await;

    assert_eq!(transport.revoke_calls().await, vec!["com.a"]);
}

#[tokio::test]
async fn test_reset_survives_listing_and_read_failures() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_file(DEFAULT_STORE_PATH, r#"["com.a"]"#)
            .failing_listing()
            .failing_reads(),
    );
    let registry = registry_with(&transport);

    let report = registry.deauthorize_all_report().await;

    assert!(report.candidates.is_empty());
    assert_eq!(transport.revoke_calls().await, vec![DEFAULT_FALLBACK_ID]);
}

#[tokio::test]
async fn test_reset_single_failure_does_not_raise() {
    let transport = Arc::new(MemoryTransport::new().failing_revoke(DEFAULT_FALLBACK_ID));
    let registry = registry_with(&transport);

    let report = registry.deauthorize_all_report().await;

    assert_eq!(report.failed(), vec![DEFAULT_FALLBACK_ID]);
}

#[tokio::test]
async fn test_reset_keeps_stale_entries_in_record() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_file(DEFAULT_STORE_PATH, r#"["com.a","com.b"]"#)
            .with_installed(["com.a"]),
    );
    let registry = registry_with(&transport);

    registry.deauthorize_all().await;

    let set = registry.authorized_ids().await;
    assert_eq!(set.iter().collect::<Vec<_>>(), vec!["com.a", "com.b"]);
    assert_eq!(transport.write_calls().await, 0);
}

#[tokio::test]
async fn test_authorize_then_reset_after_uninstall() {
    let transport = Arc::new(MemoryTransport::new().with_installed(["com.a", "com.b"]));
    let registry = registry_with(&transport);

    registry.authorize("com.a").await.unwrap();
    registry.authorize("com.b").await.unwrap();
    transport.set_installed(vec!["com.b".to_string()]).await;

    registry.deauthorize_all().await;

    assert_eq!(transport.revoke_calls().await, vec!["com.b"]);
    assert_eq!(transport.active_grants().await, vec!["com.a"]);
}

#[tokio::test]
async fn test_reset_revokes_are_in_flight_together() {
    let transport = Arc::new(RendezvousTransport::new(r#"["a","b"]"#, &["a", "b"]).gating_revokes());
    let registry = AuthorizationRegistry::new(transport, RegistryConfig::default());

    let report = tokio::time::timeout(Duration::from_secs(3), registry.deauthorize_all_report())
        .await
        .expect("revokes should run concurrently");

    assert_eq!(report.revoked(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_reset_fetches_listing_and_record_together() {
    let transport =
        Arc::new(RendezvousTransport::new(r#"["a","b"]"#, &["b", "c"]).gating_fetches());
    let registry = AuthorizationRegistry::new(transport, RegistryConfig::default());

    let report = tokio::time::timeout(Duration::from_secs(3), registry.deauthorize_all_report())
        .await
        .expect("listing and record load should run concurrently");

    assert_eq!(report.candidates, vec!["b"]);
    assert_eq!(report.revoked(), vec!["b"]);
}

#[tokio::test]
async fn test_global_toggle_device_resets_once() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_global_toggle()
            .with_file(DEFAULT_STORE_PATH, r#"["com.a","com.b"]"#)
            .with_installed(["com.a", "com.b"]),
    );
    let registry = registry_with(&transport);
    registry.authorize("com.a").await.unwrap();

    let report = registry.deauthorize_all_report().await;

    assert!(report.candidates.is_empty());
    assert_eq!(transport.revoke_calls().await, vec![DEFAULT_FALLBACK_ID]);
    assert!(transport.active_grants().await.is_empty());
}
