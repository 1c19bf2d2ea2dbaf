//! Mock-location authorization registry for Android devices.
//!
//! This crate provides:
//!
//! - An authorization registry that grants mock-location access per app,
//!   records every granted app id on the device, and later revokes the ones
//!   that are still installed
//! - An `adb` command-line transport for talking to a device
//! - Geolocation commands (get/set/refresh, location services, reset)
//! - An in-memory transport for tests
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mockloc_registry::{AdbTransport, AuthorizationRegistry, RegistryConfig};
//!
//! # async fn example() -> mockloc_registry::RegistryResult<()> {
//! let config = RegistryConfig::from_env();
//! let transport = Arc::new(AdbTransport::new(&config));
//! let registry = AuthorizationRegistry::new(transport, config);
//!
//! registry.authorize("io.appium.settings").await?;
//! // ... run the session ...
//! registry.deauthorize_all().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `MOCKLOC_STORE_PATH` | Remote record path (default: `/data/local/tmp/mock_apps.json`) |
//! | `MOCKLOC_FALLBACK_ID` | Id revoked when nothing else qualifies (default: `io.appium.settings`) |
//! | `MOCKLOC_ADB_PATH` | adb executable (default: `adb`) |
//! | `MOCKLOC_DEVICE_SERIAL` | Target device serial |
//! | `MOCKLOC_COMMAND_TIMEOUT` | Per-command timeout in seconds (default: 20) |
//! | `MOCKLOC_EMULATOR` | Target is an emulator |

pub mod adb;
pub mod error;
pub mod geolocation;
pub mod memory;
pub mod registry;
pub mod transport;
pub mod types;

// Re-export main types
pub use adb::{AdbTransport, MIN_APPOPS_API_LEVEL};
pub use error::{RegistryError, RegistryResult};
pub use geolocation::{
    GeoSettings, GeolocationCommands, Location, LocationServices,
    DEFAULT_GPS_CACHE_REFRESH_TIMEOUT, GEO_EPSILON,
};
pub use memory::MemoryTransport;
pub use registry::{AuthorizationRegistry, DeauthorizeReport, RevokeOutcome};
pub use transport::AuthorizationTransport;
pub use types::{AuthorizationSet, RegistryConfig, DEFAULT_FALLBACK_ID, DEFAULT_STORE_PATH};
