//! Persisted record and configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default on-device location of the authorization record.
pub const DEFAULT_STORE_PATH: &str = "/data/local/tmp/mock_apps.json";

/// Package id of the settings helper; revoked when nothing else qualifies.
pub const DEFAULT_FALLBACK_ID: &str = "io.appium.settings";

/// Identifiers ever authorized through the registry.
///
/// Serialized as a bare JSON array of strings. Order follows insertion and
/// carries no meaning beyond stable output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorizationSet {
    ids: Vec<String>,
}

impl AuthorizationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a persisted record, dropping duplicates while keeping first occurrence.
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        let raw: Vec<String> = serde_json::from_slice(bytes)?;
        Ok(raw.into_iter().collect())
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.ids)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    /// Append `id`; returns `false` when it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Ids of this set that also appear in `reference`, in this set's order.
    pub fn intersection(&self, reference: &[String]) -> Vec<String> {
        self.ids
            .iter()
            .filter(|id| reference.contains(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for AuthorizationSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Remote path of the persisted authorization record.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Identifier revoked when no authorized id is still installed.
    #[serde(default = "default_fallback_id")]
    pub fallback_id: String,

    /// adb executable.
    #[serde(default = "default_adb_path")]
    pub adb_path: String,

    /// Device serial passed as `adb -s`.
    #[serde(default)]
    pub device_serial: Option<String>,

    /// Per-command timeout in seconds.
    #[serde(default = "default_timeout")]
    pub command_timeout_secs: u64,

    /// Whether the target is an emulator.
    #[serde(default)]
    pub emulator: bool,
}

fn default_store_path() -> String {
    DEFAULT_STORE_PATH.to_string()
}

fn default_fallback_id() -> String {
    DEFAULT_FALLBACK_ID.to_string()
}

fn default_adb_path() -> String {
    "adb".to_string()
}

fn default_timeout() -> u64 {
    20
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            fallback_id: default_fallback_id(),
            adb_path: default_adb_path(),
            device_serial: None,
            command_timeout_secs: default_timeout(),
            emulator: false,
        }
    }
}

impl RegistryConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `MOCKLOC_STORE_PATH` | Remote path of the authorization record |
    /// | `MOCKLOC_FALLBACK_ID` | Identifier revoked when nothing else qualifies |
    /// | `MOCKLOC_ADB_PATH` | adb executable |
    /// | `MOCKLOC_DEVICE_SERIAL` | Target device serial |
    /// | `MOCKLOC_COMMAND_TIMEOUT` | Per-command timeout in seconds |
    /// | `MOCKLOC_EMULATOR` | Target is an emulator |
    pub fn from_env() -> Self {
        Self {
            store_path: std::env::var("MOCKLOC_STORE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_store_path),
            fallback_id: std::env::var("MOCKLOC_FALLBACK_ID")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_fallback_id),
            adb_path: std::env::var("MOCKLOC_ADB_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(default_adb_path),
            device_serial: std::env::var("MOCKLOC_DEVICE_SERIAL")
                .ok()
                .filter(|v| !v.is_empty()),
            command_timeout_secs: std::env::var("MOCKLOC_COMMAND_TIMEOUT")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or_else(default_timeout),
            emulator: std::env::var("MOCKLOC_EMULATOR")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// Per-command timeout. Zero falls back to the default.
    pub fn command_timeout(&self) -> Duration {
        match self.command_timeout_secs {
            0 => Duration::from_secs(default_timeout()),
            secs => Duration::from_secs(secs),
        }
    }

    /// Set the remote store path.
    pub fn with_store_path(mut self, path: impl Into<String>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Set the fallback identifier.
    pub fn with_fallback_id(mut self, id: impl Into<String>) -> Self {
        self.fallback_id = id.into();
        self
    }

    /// Target a specific device.
    pub fn with_device_serial(mut self, serial: impl Into<String>) -> Self {
        self.device_serial = Some(serial.into());
        self
    }

    pub fn with_adb_path(mut self, path: impl Into<String>) -> Self {
        self.adb_path = path.into();
        self
    }

    pub fn with_command_timeout(mut self, secs: u64) -> Self {
        self.command_timeout_secs = secs;
        self
    }

    pub fn with_emulator(mut self, emulator: bool) -> Self {
        self.emulator = emulator;
        self
    }
}
