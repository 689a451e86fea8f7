// platform.rs — Abstract host-platform collaborators.
//
// The real magnetometer and location services live outside this crate; the
// tracker only sees them as subscription sources that push samples into an
// mpsc channel. The simulated implementations below stand in for the device
// APIs in the CLI harness and in tests.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::types::{now_ms, LocationSample, MagneticSample};

/// Outcome of the foreground-location authorization request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authorization {
    Granted,
    Denied,
}

impl Authorization {
    pub fn is_granted(self) -> bool {
        matches!(self, Authorization::Granted)
    }
}

/// Accuracy tier requested from the location service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accuracy {
    Low,
    Balanced,
    High,
}

/// Parameters of the location subscription. The distance threshold is zero
/// so stationary periodic updates are still delivered.
#[derive(Clone, Debug)]
pub struct LocationOptions {
    pub accuracy: Accuracy,
    pub min_interval: Duration,
    pub min_distance_m: f64,
}

impl Default for LocationOptions {
    fn default() -> Self {
        LocationOptions {
            accuracy: Accuracy::Balanced,
            min_interval: Duration::from_secs(1),
            min_distance_m: 0.0,
        }
    }
}

/// Magnetic-field subscription source. No authorization step.
pub trait MagnetometerSource: Send + 'static {
    /// Begin delivering samples at the given interval. Dropping the
    /// receiver cancels the subscription.
    fn watch(&mut self, interval: Duration) -> mpsc::Receiver<MagneticSample>;
}

/// Geolocation subscription source, gated behind an authorization request.
pub trait LocationSource: Send + 'static {
    fn request_authorization(&mut self) -> impl Future<Output = Authorization> + Send;

    /// Begin delivering fixes per `options`. Dropping the receiver cancels
    /// the subscription. Must only be called after a grant.
    fn watch(&mut self, options: LocationOptions) -> mpsc::Receiver<LocationSample>;
}

// ─── Simulated sources ───────────────────────────────────────────────────────

/// Sinusoidal field generator standing in for the device magnetometer.
pub struct SimulatedMagnetometer;

impl MagnetometerSource for SimulatedMagnetometer {
    fn watch(&mut self, interval: Duration) -> mpsc::Receiver<MagneticSample> {
        let (tx, rx) = mpsc::channel(64);
        let dt = interval.as_secs_f64();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut seq = 0u64;

            loop {
                ticker.tick().await;
                let t = seq as f64 * dt;
                seq += 1;

                let sample = MagneticSample {
                    timestamp_ms: now_ms(),
                    x: 22.0 + (t * 0.7).sin() * 3.0,
                    y: -4.0 + (t * 0.9).cos() * 2.0,
                    z: 41.0 + (t * 0.4).sin() * 1.5,
                };

                match tx.try_send(sample) {
                    Ok(_) => {}
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        // Subscriber is behind, drop this sample
                    }
                }
            }
        });

        rx
    }
}

/// Slow-drift fix generator standing in for the location service.
pub struct SimulatedLocation {
    pub authorization: Authorization,
    pub origin: (f64, f64),
}

impl Default for SimulatedLocation {
    fn default() -> Self {
        SimulatedLocation {
            authorization: Authorization::Granted,
            origin: (37.7749, -122.4194),
        }
    }
}

impl LocationSource for SimulatedLocation {
    fn request_authorization(&mut self) -> impl Future<Output = Authorization> + Send {
        std::future::ready(self.authorization)
    }

    fn watch(&mut self, options: LocationOptions) -> mpsc::Receiver<LocationSample> {
        let (tx, rx) = mpsc::channel(16);
        let (origin_lat, origin_lon) = self.origin;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(options.min_interval);
            let mut seq = 0u64;

            loop {
                ticker.tick().await;
                let drift = seq as f64;
                seq += 1;

                let fix = LocationSample {
                    timestamp_ms: now_ms(),
                    latitude: origin_lat + drift * 0.00001,
                    longitude: origin_lon + drift * 0.00001,
                };

                match tx.try_send(fix) {
                    Ok(_) => {}
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                    Err(mpsc::error::TrySendError::Full(_)) => {}
                }
            }
        });

        rx
    }
}
