use serde::{Deserialize, Serialize};
use std::fs;

use crate::types::{MarkerPosition, ViewportSize};

/// Point-in-time view of the tracking loop, for logging and the CLI
/// readout. Derived on demand from the shared counters; holds no state of
/// its own.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TrackerStatus {
    pub timestamp_ms: i64,
    pub active: bool,
    pub authorized: bool,
    pub uptime_seconds: u64,
    // Sensor feeds
    pub magnetic_samples: u64,
    pub location_fixes: u64,
    pub magnetic_silence_secs: f64,
    pub location_silence_secs: f64,
    // Dispatch loop
    pub ticks: u64,
    pub dispatched: u64,
    pub skipped_in_flight: u64,
    pub skipped_incomplete: u64,
    pub failures: u64,
    pub request_in_flight: bool,
    // Overlay
    pub viewport: ViewportSize,
    pub marker: Option<MarkerPosition>,
}

impl TrackerStatus {
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
