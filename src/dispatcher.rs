// dispatcher.rs — Timer-driven fusion loop.
//
// Every 2 s: snapshot the latest state, validate completeness, and if no
// request is outstanding send one fused request to the backend. Slow
// backends reduce the effective sampling rate (ticks are dropped, never
// queued); the in-flight flag bounds outstanding requests to one.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::predict::{FusionRequest, PredictClient, PredictError};
use crate::state::LatestState;
use crate::types::PositionAnswer;

/// What a single dispatch tick did.
#[derive(Clone, Debug)]
pub enum TickOutcome {
    /// Request sent, answer accepted and recorded.
    Dispatched,
    /// A prior request was still outstanding; tick dropped.
    SkippedInFlight,
    /// Magnetic or location sample missing; tick dropped.
    SkippedIncomplete,
    /// Transport failure, non-success status, or malformed body. Logged
    /// and discarded; the marker keeps its prior value.
    Failed(PredictError),
}

/// Tick bookkeeping shared with the status snapshot.
#[derive(Debug, Default)]
pub struct DispatchCounters {
    pub ticks: AtomicU64,
    pub dispatched: AtomicU64,
    pub skipped_in_flight: AtomicU64,
    pub skipped_incomplete: AtomicU64,
    pub failures: AtomicU64,
}

/// Latest accepted backend answer. Persists stale across failures and is
/// never cleared — only a newer valid answer replaces it.
#[derive(Clone, Default)]
pub struct PositionLedger {
    inner: Arc<Mutex<Option<PositionAnswer>>>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, answer: PositionAnswer) {
        *self.inner.lock().unwrap() = Some(answer);
    }

    pub fn latest(&self) -> Option<PositionAnswer> {
        *self.inner.lock().unwrap()
    }
}

/// Clears the in-flight flag on every exit path, including cancellation of
/// the dispatch future mid-request.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        InFlightGuard(flag)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct FusionDispatcher {
    state: LatestState,
    client: PredictClient,
    ledger: PositionLedger,
    counters: Arc<DispatchCounters>,
    in_flight: Arc<AtomicBool>,
    period: Duration,
}

impl FusionDispatcher {
    pub fn new(
        state: LatestState,
        client: PredictClient,
        ledger: PositionLedger,
        counters: Arc<DispatchCounters>,
        period: Duration,
    ) -> Self {
        FusionDispatcher {
            state,
            client,
            ledger,
            counters,
            in_flight: Arc::new(AtomicBool::new(false)),
            period,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// One dispatch cycle: snapshot, validate, send, apply.
    pub async fn run_once(&self) -> TickOutcome {
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);

        let snapshot = self.state.snapshot();

        if self.in_flight.load(Ordering::SeqCst) {
            self.counters.skipped_in_flight.fetch_add(1, Ordering::Relaxed);
            return TickOutcome::SkippedInFlight;
        }

        let Some(request) = FusionRequest::from_snapshot(&snapshot) else {
            self.counters.skipped_incomplete.fetch_add(1, Ordering::Relaxed);
            return TickOutcome::SkippedIncomplete;
        };

        log::debug!(
            "tick: room={:?} mag=({:.2}, {:.2}, {:.2}) gps=({:.5}, {:.5})",
            request.room,
            request.mag.x,
            request.mag.y,
            request.mag.z,
            request.gps.lat,
            request.gps.lon
        );

        let _guard = InFlightGuard::set(&self.in_flight);

        match self.client.predict(&request).await {
            Ok(answer) => {
                self.ledger.record(answer);
                self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
                TickOutcome::Dispatched
            }
            Err(err) => {
                log::warn!("predict failed: {}", err);
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                TickOutcome::Failed(err)
            }
        }
    }

    /// Fixed-period loop. The first tick fires one period after start (the
    /// screen shows nothing until the sensors have warmed up anyway), and
    /// missed ticks are dropped rather than deferred. Shutdown races the
    /// in-flight request, so teardown aborts outstanding work and a late
    /// response is never applied.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let start = tokio::time::Instant::now() + self.period;
        let mut ticker = tokio::time::interval_at(start, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _outcome = self.run_once() => {}
                    }
                }
            }
        }

        log::debug!("dispatcher stopped");
    }
}
