//! Transport that drives a device through the `adb` executable.
//!
//! Every call spawns `adb [-s SERIAL] ...` and is bounded by the configured
//! command timeout. Non-zero exits and timeouts map to
//! [`RegistryError::Transport`].

use std::io::Write;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::geolocation::LocationServices;
use crate::transport::AuthorizationTransport;
use crate::types::RegistryConfig;

mod parse;

use parse::{parse_api_level, parse_location_providers, parse_package_list, shell_quote};

/// First API level with per-app `appops` control of mock locations.
/// Older devices only expose the global `mock_location` secure setting.
pub const MIN_APPOPS_API_LEVEL: u32 = 23;

const MOCK_LOCATION_OP: &str = "android:mock_location";

/// adb-backed transport for one device.
#[derive(Debug)]
pub struct AdbTransport {
    adb_path: String,
    serial: Option<String>,
    timeout: Duration,
    api_level: OnceCell<u32>,
}

impl AdbTransport {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            adb_path: config.adb_path.clone(),
            serial: config.device_serial.clone(),
            timeout: config.command_timeout(),
            api_level: OnceCell::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(&RegistryConfig::from_env())
    }

    /// Device API level, queried once.
    pub async fn api_level(&self) -> RegistryResult<u32> {
        self.api_level
            .get_or_try_init(|| async {
                let out = self.shell(&["getprop", "ro.build.version.sdk"]).await?;
                parse_api_level(&out)
            })
            .await
            .copied()
    }

    /// Run `adb shell` with pre-quoted arguments and return stdout.
    pub async fn shell(&self, args: &[&str]) -> RegistryResult<String> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push("shell");
        full.extend_from_slice(args);
        let stdout = self.run_checked(&full).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    pub async fn file_exists(&self, path: &str) -> RegistryResult<bool> {
        let quoted = shell_quote(path);
        let out = self
            .shell(&["test", "-e", &quoted, "&&", "echo", "1", "||", "echo", "0"])
            .await?;
        Ok(out.trim() == "1")
    }

    async fn set_mock_location(&self, id: &str, allow: bool) -> RegistryResult<()> {
        if self.uses_global_toggle().await? {
            let value = if allow { "1" } else { "0" };
            self.shell(&["settings", "put", "secure", "mock_location", value])
                .await?;
        } else {
            let mode = if allow { "allow" } else { "deny" };
            let quoted = shell_quote(id);
            self.shell(&["appops", "set", &quoted, MOCK_LOCATION_OP, mode])
                .await?;
        }
        Ok(())
    }

    async fn run(&self, args: &[&str]) -> RegistryResult<Output> {
        let mut cmd = Command::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(adb = %self.adb_path, args = ?args, "running adb");

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(RegistryError::Transport {
                message: format!("failed to spawn {}: {}", self.adb_path, e),
            }),
            Err(_) => Err(RegistryError::Transport {
                message: format!(
                    "adb {} timed out after {}s",
                    args.join(" "),
                    self.timeout.as_secs()
                ),
            }),
        }
    }

    async fn run_checked(&self, args: &[&str]) -> RegistryResult<Vec<u8>> {
        let output = self.run(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RegistryError::Transport {
                message: format!(
                    "adb {} exited with {}: {}",
                    args.join(" "),
                    output.status,
                    stderr.trim()
                ),
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl AuthorizationTransport for AdbTransport {
    async fn grant(&self, id: &str) -> RegistryResult<()> {
        self.set_mock_location(id, true).await
    }

    async fn revoke(&self, id: &str) -> RegistryResult<()> {
        self.set_mock_location(id, false).await
    }

    async fn read_remote_file(&self, path: &str) -> RegistryResult<Vec<u8>> {
        if !self.file_exists(path).await? {
            return Err(RegistryError::NotFound {
                path: path.to_string(),
            });
        }
        let quoted = shell_quote(path);
        self.run_checked(&["shell", "cat", &quoted]).await
    }

    async fn write_remote_file(&self, path: &str, bytes: &[u8]) -> RegistryResult<()> {
        // Staged locally, pushed next to the target, then moved into place.
        let mut staged = tempfile::Builder::new()
            .prefix("mockloc-")
            .suffix(".json")
            .tempfile()?;
        staged.write_all(bytes)?;
        staged.flush()?;

        let local = staged.path().to_string_lossy().into_owned();
        let remote_tmp = format!("{}.tmp", path);

        self.run_checked(&["push", &local, &remote_tmp]).await?;

        let quoted_tmp = shell_quote(&remote_tmp);
        let quoted_path = shell_quote(path);
        if let Err(e) = self.shell(&["mv", "-f", &quoted_tmp, &quoted_path]).await {
            if let Err(cleanup) = self.shell(&["rm", "-f", &quoted_tmp]).await {
                warn!(path = %remote_tmp, error = %cleanup, "failed to remove staged remote file");
            }
            return Err(e);
        }

        debug!(path, bytes = bytes.len(), "wrote remote file");
        Ok(())
    }

    async fn list_reference_ids(&self) -> RegistryResult<Vec<String>> {
        let out = self.shell(&["pm", "list", "packages", "-3"]).await?;
        Ok(parse_package_list(&out))
    }

    async fn uses_global_toggle(&self) -> RegistryResult<bool> {
        Ok(self.api_level().await? < MIN_APPOPS_API_LEVEL)
    }
}

#[async_trait]
impl LocationServices for AdbTransport {
    async fn location_providers(&self) -> RegistryResult<Vec<String>> {
        let out = self
            .shell(&["settings", "get", "secure", "location_providers_allowed"])
            .await?;
        Ok(parse_location_providers(&out))
    }

    async fn set_gps_provider(&self, enabled: bool) -> RegistryResult<()> {
        let value = if enabled { "+gps" } else { "-gps" };
        self.shell(&["settings", "put", "secure", "location_providers_allowed", value])
            .await?;
        Ok(())
    }
}
