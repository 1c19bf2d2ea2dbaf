//! Geolocation commands.
//!
//! Thin command layer over the on-device settings helper (which actually
//! feeds mock fixes to the location manager) and the device's location
//! provider settings. Mock-location permissions go through the
//! [`AuthorizationRegistry`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::registry::AuthorizationRegistry;

/// Smallest positive `f64`.
///
/// Reported instead of a zero coordinate so that strictly typed clients
/// receive a floating point value rather than an integer `0`.
pub const GEO_EPSILON: f64 = 5e-324;

/// Default wait for a GPS cache refresh.
pub const DEFAULT_GPS_CACHE_REFRESH_TIMEOUT: Duration = Duration::from_secs(20);

/// A geographic fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,

    /// Satellites in view (1-12). Emulators only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satellites: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    /// Real devices only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,

    /// Real devices only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Self::default()
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    /// The all-epsilon fix reported when the device cannot be read.
    pub fn epsilon() -> Self {
        Self::new(GEO_EPSILON, GEO_EPSILON).with_altitude(GEO_EPSILON)
    }

    /// Replace zero, NaN, or missing coordinates with [`GEO_EPSILON`].
    pub fn normalized(self) -> Self {
        Self {
            latitude: or_epsilon(Some(self.latitude)),
            longitude: or_epsilon(Some(self.longitude)),
            altitude: Some(or_epsilon(self.altitude)),
            ..self
        }
    }
}

fn or_epsilon(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v != 0.0 && !v.is_nan() => v,
        _ => GEO_EPSILON,
    }
}

/// The settings helper application on the device.
#[async_trait]
pub trait GeoSettings: Send + Sync + std::fmt::Debug {
    async fn get_location(&self) -> RegistryResult<Location>;

    async fn set_location(&self, location: &Location, is_emulator: bool) -> RegistryResult<()>;

    /// Ask the device to refresh its GPS cache, waiting at most `timeout`.
    /// A zero timeout returns without waiting.
    async fn refresh_location_cache(&self, timeout: Duration) -> RegistryResult<()>;
}

/// Location provider switches of the device.
#[async_trait]
pub trait LocationServices: Send + Sync + std::fmt::Debug {
    /// Enabled providers, e.g. `["gps", "network"]`.
    async fn location_providers(&self) -> RegistryResult<Vec<String>>;

    async fn set_gps_provider(&self, enabled: bool) -> RegistryResult<()>;
}

/// Geolocation commands for one device.
#[derive(Debug, Clone)]
pub struct GeolocationCommands {
    settings: Arc<dyn GeoSettings>,
    services: Arc<dyn LocationServices>,
    registry: AuthorizationRegistry,
}

impl GeolocationCommands {
    pub fn new(
        settings: Arc<dyn GeoSettings>,
        services: Arc<dyn LocationServices>,
        registry: AuthorizationRegistry,
    ) -> Self {
        Self {
            settings,
            services,
            registry,
        }
    }

    pub fn registry(&self) -> &AuthorizationRegistry {
        &self.registry
    }

    fn is_emulator(&self) -> bool {
        self.registry.config().emulator
    }

    pub async fn get_location(&self) -> RegistryResult<Location> {
        Ok(self.settings.get_location().await?.normalized())
    }

    /// Set the location and report what the device now returns.
    ///
    /// If the read-back fails the epsilon fix is returned instead.
    pub async fn set_location(&self, location: &Location) -> RegistryResult<Location> {
        self.settings
            .set_location(location, self.is_emulator())
            .await?;

        match self.get_location().await {
            Ok(current) => Ok(current),
            Err(e) => {
                warn!(error = %e, "could not get the current geolocation, returning epsilon values");
                Ok(Location::epsilon())
            }
        }
    }

    /// Set the location including speed, bearing, accuracy and satellites,
    /// without reading it back.
    pub async fn set_location_detailed(&self, location: &Location) -> RegistryResult<()> {
        self.settings
            .set_location(location, self.is_emulator())
            .await
    }

    /// Refresh the GPS cache. `None` waits the default 20 seconds.
    pub async fn refresh_gps_cache(&self, timeout: Option<Duration>) -> RegistryResult<()> {
        let timeout = timeout.unwrap_or(DEFAULT_GPS_CACHE_REFRESH_TIMEOUT);
        self.settings.refresh_location_cache(timeout).await
    }

    pub async fn is_location_services_enabled(&self) -> RegistryResult<bool> {
        let providers = self.services.location_providers().await?;
        Ok(providers.iter().any(|p| p == "gps"))
    }

    pub async fn toggle_location_services(&self) -> RegistryResult<()> {
        info!("toggling location services");
        let enabled = self.is_location_services_enabled().await?;
        debug!(
            gps_enabled = enabled,
            "gps provider is going to be {}",
            if enabled { "disabled" } else { "enabled" }
        );
        self.services.set_gps_provider(!enabled).await
    }

    /// Allow `app_id` to provide mock locations.
    pub async fn allow_mock_location(&self, app_id: &str) -> RegistryResult<()> {
        self.registry.authorize(app_id).await
    }

    /// Withdraw mock-location access from every recorded app.
    ///
    /// Emulators have no per-app mock-location state to reset.
    pub async fn reset_geolocation(&self) -> RegistryResult<()> {
        if self.is_emulator() {
            return Err(RegistryError::Unsupported {
                operation: "reset geolocation".to_string(),
                reason: "geolocation reset does not work on emulators".to_string(),
            });
        }
        self.registry.deauthorize_all().await;
        Ok(())
    }
}
