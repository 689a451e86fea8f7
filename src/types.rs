use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Magnetic-field reading along the device axes, in microtesla.
/// Superseded by the next sample; no history is kept anywhere.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MagneticSample {
    pub timestamp_ms: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Geolocation fix in decimal degrees.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocationSample {
    pub timestamp_ms: i64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Backend answer from `/predict`. Its coordinate space (normalized unit
/// square vs. native floor-plan pixels) is a deployment configuration, not
/// something carried in the payload.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionAnswer {
    pub x: f64,
    pub y: f64,
}

/// Rendered size of the floor-plan image inside the zoom/pan container.
/// Distinct from the image's native resolution; all-zero until the first
/// layout pass completes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    pub fn new(width: f64, height: f64) -> Self {
        ViewportSize { width, height }
    }

    pub fn is_ready(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Marker position in rendered-viewport pixels, the only form the overlay
/// consumes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerPosition {
    pub x: f64,
    pub y: f64,
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
