// sensors.rs — Feed tasks between the platform subscriptions and the
// latest-state cache.
//
// Each task drains one subscription channel, stamps every sample at the
// moment of receipt, and overwrites the matching cache slot. The tasks are
// independent of how the samples are produced — device APIs, simulators,
// or test fixtures all deliver through the same channels.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;

use crate::state::LatestState;
use crate::types::{now_ms, LocationSample, MagneticSample};

/// Receipt bookkeeping for one source.
#[derive(Debug, Default)]
pub struct FeedHealth {
    samples: AtomicU64,
    last_receipt: Mutex<Option<Instant>>,
}

impl FeedHealth {
    fn touch(&self) {
        self.samples.fetch_add(1, Ordering::Relaxed);
        *self.last_receipt.lock().unwrap() = Some(Instant::now());
    }

    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// Time since the last delivered sample; `None` before the first one.
    pub fn silence(&self) -> Option<Duration> {
        self.last_receipt.lock().unwrap().map(|t| t.elapsed())
    }
}

#[derive(Debug, Default)]
pub struct FeedCounters {
    pub magnetic: FeedHealth,
    pub location: FeedHealth,
}

pub async fn magnetic_loop(
    mut rx: Receiver<MagneticSample>,
    state: LatestState,
    counters: Arc<FeedCounters>,
) {
    let mut received = 0u64;

    while let Some(mut sample) = rx.recv().await {
        // Stamped at receipt, not at capture.
        sample.timestamp_ms = now_ms();
        state.set_magnetic(sample);
        counters.magnetic.touch();

        received += 1;
        if received % 100 == 0 {
            log::debug!("[mag] {} samples", received);
        }
    }

    log::debug!("[mag] subscription closed after {} samples", received);
}

pub async fn location_loop(
    mut rx: Receiver<LocationSample>,
    state: LatestState,
    counters: Arc<FeedCounters>,
) {
    let mut received = 0u64;

    while let Some(mut fix) = rx.recv().await {
        fix.timestamp_ms = now_ms();
        state.set_location(fix);
        counters.location.touch();

        received += 1;
        if received % 10 == 0 {
            log::debug!("[gps] {} fixes", received);
        }
    }

    log::debug!("[gps] subscription closed after {} fixes", received);
}

/// Owns the feed tasks for the screen's active lifetime.
///
/// Teardown aborts them exactly once and tolerates subscriptions that were
/// never created (denied authorization leaves the feed inert).
pub struct SensorFeed {
    handles: Vec<JoinHandle<()>>,
}

impl SensorFeed {
    /// A feed with no subscriptions; shutdown is a no-op.
    pub fn inert() -> Self {
        SensorFeed { handles: Vec::new() }
    }

    pub fn spawn(
        magnetic_rx: Receiver<MagneticSample>,
        location_rx: Receiver<LocationSample>,
        state: &LatestState,
        counters: &Arc<FeedCounters>,
    ) -> Self {
        let handles = vec![
            tokio::spawn(magnetic_loop(magnetic_rx, state.clone(), counters.clone())),
            tokio::spawn(location_loop(location_rx, state.clone(), counters.clone())),
        ];
        SensorFeed { handles }
    }

    pub fn shutdown(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for SensorFeed {
    fn drop(&mut self) {
        self.shutdown();
    }
}
