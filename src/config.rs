use std::time::Duration;

use crate::platform::LocationOptions;
use crate::projector::CoordinateSpace;

/// Everything tunable about the sensing-and-overlay loop, in one place.
///
/// The coordinate space of backend answers is part of the deployment
/// contract (see `CoordinateSpace`); it is configured here and never
/// negotiated per request.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Full URL of the localization backend's predict endpoint.
    pub endpoint: String,

    /// Fixed spacing between fusion dispatch ticks.
    pub dispatch_period: Duration,

    /// Per-request network timeout enforced by the backend client.
    pub request_timeout: Duration,

    /// Magnetometer sample interval (~10 Hz).
    pub magnetic_interval: Duration,

    /// Location subscription parameters (~1 Hz, balanced accuracy,
    /// zero distance threshold).
    pub location: LocationOptions,

    /// Coordinate space the backend answers in.
    pub coordinate_space: CoordinateSpace,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            endpoint: "http://127.0.0.1:8000/predict".to_string(),
            dispatch_period: Duration::from_millis(2000),
            request_timeout: Duration::from_secs(10),
            magnetic_interval: Duration::from_millis(100),
            location: LocationOptions::default(),
            coordinate_space: CoordinateSpace::Normalized,
        }
    }
}
