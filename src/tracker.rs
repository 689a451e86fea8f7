// tracker.rs — Screen-lifecycle orchestrator.
//
// Owns everything with a lifetime tied to the screen being active: the
// sensor subscriptions, the dispatch timer, and the shutdown signal that
// cancels them together. Marker and overlay are derived on demand from the
// latest accepted answer and the current viewport, so a layout change
// reprojects without waiting for the next backend answer.

use std::fmt::{Display, Formatter};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::TrackerConfig;
use crate::dispatcher::{DispatchCounters, FusionDispatcher, PositionLedger};
use crate::overlay::{self, MarkerOverlay};
use crate::platform::{Authorization, LocationSource, MagnetometerSource};
use crate::predict::PredictClient;
use crate::projector;
use crate::sensors::{FeedCounters, SensorFeed};
use crate::state::LatestState;
use crate::status::TrackerStatus;
use crate::types::{now_ms, MarkerPosition};
use crate::viewport::ViewportLayoutTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Active,
}

#[derive(Debug, Clone)]
pub enum TrackerError {
    AlreadyActive,
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            TrackerError::AlreadyActive => write!(f, "Tracker already active"),
        }
    }
}

impl std::error::Error for TrackerError {}

struct ActiveLoop {
    feed: SensorFeed,
    dispatcher: Option<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
    authorized: bool,
    started: Instant,
}

pub struct PositionTracker {
    config: TrackerConfig,
    state: LatestState,
    viewport: ViewportLayoutTracker,
    ledger: PositionLedger,
    feed_counters: Arc<FeedCounters>,
    dispatch_counters: Arc<DispatchCounters>,
    dispatcher: FusionDispatcher,
    active: Option<ActiveLoop>,
}

impl PositionTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let state = LatestState::new();
        let ledger = PositionLedger::new();
        let dispatch_counters = Arc::new(DispatchCounters::default());
        let client = PredictClient::new(&config.endpoint, config.request_timeout);
        let dispatcher = FusionDispatcher::new(
            state.clone(),
            client,
            ledger.clone(),
            dispatch_counters.clone(),
            config.dispatch_period,
        );

        PositionTracker {
            config,
            state,
            viewport: ViewportLayoutTracker::new(),
            ledger,
            feed_counters: Arc::new(FeedCounters::default()),
            dispatch_counters,
            dispatcher,
            active: None,
        }
    }

    pub fn state(&self) -> TrackerState {
        if self.active.is_some() {
            TrackerState::Active
        } else {
            TrackerState::Idle
        }
    }

    /// Bring the loop up: request location authorization, create the
    /// subscriptions, start the dispatch timer.
    ///
    /// On denial nothing is subscribed and the timer never starts — the
    /// feature is inert for the session, with no user-visible error. The
    /// grant outcome is returned either way.
    pub async fn activate<M, L>(
        &mut self,
        mut magnetometer: M,
        mut location: L,
    ) -> Result<Authorization, TrackerError>
    where
        M: MagnetometerSource,
        L: LocationSource,
    {
        if self.active.is_some() {
            return Err(TrackerError::AlreadyActive);
        }

        let authorization = location.request_authorization().await;
        log::info!("location authorization: {:?}", authorization);

        let (shutdown, shutdown_rx) = watch::channel(false);

        if !authorization.is_granted() {
            self.active = Some(ActiveLoop {
                feed: SensorFeed::inert(),
                dispatcher: None,
                shutdown,
                authorized: false,
                started: Instant::now(),
            });
            return Ok(authorization);
        }

        let magnetic_rx = magnetometer.watch(self.config.magnetic_interval);
        let location_rx = location.watch(self.config.location.clone());
        let feed = SensorFeed::spawn(magnetic_rx, location_rx, &self.state, &self.feed_counters);
        let dispatcher = tokio::spawn(self.dispatcher.clone().run(shutdown_rx));

        self.active = Some(ActiveLoop {
            feed,
            dispatcher: Some(dispatcher),
            shutdown,
            authorized: true,
            started: Instant::now(),
        });
        Ok(authorization)
    }

    /// Tear the loop down: stop the timer, abort the feeds, drop any
    /// outstanding request. Idempotent, and a no-op for a tracker whose
    /// subscriptions were never created.
    pub async fn deactivate(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        let _ = active.shutdown.send(true);
        active.feed.shutdown();

        if let Some(handle) = active.dispatcher {
            let _ = handle.await;
        }
    }

    /// Update the user-entered destination label. Accepted in any state.
    pub fn set_destination(&self, label: impl Into<String>) {
        self.state.set_destination(label.into());
    }

    /// Record a layout pass of the floor-plan container.
    pub fn report_layout(&self, width: f64, height: f64) {
        self.viewport.report_layout(width, height);
    }

    /// Latest answer projected into the current viewport. `None` until a
    /// valid answer has arrived and the first layout pass has completed.
    pub fn marker_position(&self) -> Option<MarkerPosition> {
        let answer = self.ledger.latest()?;
        projector::project(answer, self.config.coordinate_space, self.viewport.latest())
    }

    pub fn overlay(&self) -> Option<MarkerOverlay> {
        overlay::render(self.marker_position(), self.viewport.latest())
    }

    pub fn status(&self) -> TrackerStatus {
        let (active, authorized, uptime) = match &self.active {
            Some(a) => (true, a.authorized, a.started.elapsed().as_secs()),
            None => (false, false, 0),
        };

        TrackerStatus {
            timestamp_ms: now_ms(),
            active,
            authorized,
            uptime_seconds: uptime,
            magnetic_samples: self.feed_counters.magnetic.samples(),
            location_fixes: self.feed_counters.location.samples(),
            magnetic_silence_secs: self
                .feed_counters
                .magnetic
                .silence()
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
            location_silence_secs: self
                .feed_counters
                .location
                .silence()
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
            ticks: self.dispatch_counters.ticks.load(Ordering::Relaxed),
            dispatched: self.dispatch_counters.dispatched.load(Ordering::Relaxed),
            skipped_in_flight: self.dispatch_counters.skipped_in_flight.load(Ordering::Relaxed),
            skipped_incomplete: self.dispatch_counters.skipped_incomplete.load(Ordering::Relaxed),
            failures: self.dispatch_counters.failures.load(Ordering::Relaxed),
            request_in_flight: self.dispatcher.in_flight(),
            viewport: self.viewport.latest(),
            marker: self.marker_position(),
        }
    }
}
