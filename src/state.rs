use std::sync::{Arc, Mutex};

use crate::types::{LocationSample, MagneticSample};

/// Coherent copy of the latest-value slots, taken under one lock
/// acquisition so the dispatcher never sees a torn cross-kind combination.
#[derive(Clone, Debug, Default)]
pub struct StateSnapshot {
    pub magnetic: Option<MagneticSample>,
    pub location: Option<LocationSample>,
    pub destination: String,
}

impl StateSnapshot {
    pub fn is_complete(&self) -> bool {
        self.magnetic.is_some() && self.location.is_some()
    }
}

/// Most recent sample of each feed plus the user-entered destination label.
///
/// One mutable slot per kind; a newer sample always overwrites the prior
/// one and no history is retained. Writes never trigger dispatch — the
/// dispatcher reads this on its own timer.
#[derive(Clone, Default)]
pub struct LatestState {
    inner: Arc<Mutex<StateSnapshot>>,
}

impl LatestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_magnetic(&self, sample: MagneticSample) {
        self.inner.lock().unwrap().magnetic = Some(sample);
    }

    pub fn set_location(&self, sample: LocationSample) {
        self.inner.lock().unwrap().location = Some(sample);
    }

    pub fn set_destination(&self, label: String) {
        self.inner.lock().unwrap().destination = label;
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mag(ts: i64) -> MagneticSample {
        MagneticSample { timestamp_ms: ts, x: 1.0, y: 2.0, z: 3.0 }
    }

    fn gps(ts: i64) -> LocationSample {
        LocationSample { timestamp_ms: ts, latitude: 10.0, longitude: 20.0 }
    }

    #[test]
    fn starts_empty() {
        let state = LatestState::new();
        let snap = state.snapshot();
        assert!(!snap.is_complete());
        assert!(snap.magnetic.is_none());
        assert!(snap.location.is_none());
        assert_eq!(snap.destination, "");
    }

    #[test]
    fn newer_sample_replaces_prior() {
        let state = LatestState::new();
        state.set_magnetic(mag(1));
        state.set_magnetic(mag(2));

        let snap = state.snapshot();
        assert_eq!(snap.magnetic.unwrap().timestamp_ms, 2);
    }

    #[test]
    fn complete_only_with_both_kinds() {
        let state = LatestState::new();
        state.set_magnetic(mag(1));
        assert!(!state.snapshot().is_complete());

        state.set_location(gps(1));
        assert!(state.snapshot().is_complete());
    }

    #[test]
    fn destination_is_free_text() {
        let state = LatestState::new();
        state.set_destination("Room 204".to_string());
        assert_eq!(state.snapshot().destination, "Room 204");

        state.set_destination(String::new());
        assert_eq!(state.snapshot().destination, "");
    }
}
