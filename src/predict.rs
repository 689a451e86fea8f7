use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::Serialize;

use crate::state::StateSnapshot;
use crate::types::PositionAnswer;

/// Failures of one predict call. All of them are logged and otherwise
/// ignored by the dispatcher; the next tick is the implicit retry.
#[derive(Debug, Clone)]
pub enum PredictError {
    Timeout,
    Network(String),
    Http(u16),
    MalformedResponse(String),
}

impl Display for PredictError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            PredictError::Timeout => write!(f, "Request timeout"),
            PredictError::Network(msg) => write!(f, "Network error: {}", msg),
            PredictError::Http(code) => write!(f, "HTTP error: {}", code),
            PredictError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MagPayload {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub ts: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct GpsPayload {
    pub lat: f64,
    pub lon: f64,
    pub ts: i64,
}

/// One fused request body, exactly the wire shape the backend expects:
/// `{"room": ..., "mag": {x,y,z,ts}, "gps": {lat,lon,ts}}`.
///
/// Built at dispatch time from the latest snapshot and never persisted.
#[derive(Clone, Debug, Serialize)]
pub struct FusionRequest {
    pub room: String,
    pub mag: MagPayload,
    pub gps: GpsPayload,
}

impl FusionRequest {
    /// Returns `None` unless both sensor kinds have a sample — partial
    /// payloads are never constructed.
    pub fn from_snapshot(snapshot: &StateSnapshot) -> Option<Self> {
        let mag = snapshot.magnetic.as_ref()?;
        let gps = snapshot.location.as_ref()?;

        Some(FusionRequest {
            room: snapshot.destination.clone(),
            mag: MagPayload { x: mag.x, y: mag.y, z: mag.z, ts: mag.timestamp_ms },
            gps: GpsPayload { lat: gps.latitude, lon: gps.longitude, ts: gps.timestamp_ms },
        })
    }
}

/// HTTP client for the localization backend.
///
/// # Error Handling
/// - Transport timeout: bounded by the configured per-request timeout
/// - Non-success status: failure, no retry
/// - Body missing numeric x/y: failure, no retry
#[derive(Clone)]
pub struct PredictClient {
    client: reqwest::Client,
    endpoint: String,
}

impl PredictClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        PredictClient {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    /// POST one fused request and validate the answer structurally.
    pub async fn predict(&self, request: &FusionRequest) -> Result<PositionAnswer, PredictError> {
        let response = match self.client.post(&self.endpoint).json(request).send().await {
            Ok(resp) => resp,
            Err(e) => {
                if e.is_timeout() {
                    return Err(PredictError::Timeout);
                }
                return Err(PredictError::Network(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(PredictError::Http(status.as_u16()));
        }

        response
            .json::<PositionAnswer>()
            .await
            .map_err(|e| PredictError::MalformedResponse(e.to_string()))
    }
}
