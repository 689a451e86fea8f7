// Integration tests for the full sensing-and-dispatch loop against a local
// mock of the localization backend.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

use indoor_nav_rs::config::TrackerConfig;
use indoor_nav_rs::platform::{
    Authorization, LocationOptions, LocationSource, MagnetometerSource, SimulatedLocation,
    SimulatedMagnetometer,
};
use indoor_nav_rs::tracker::PositionTracker;
use indoor_nav_rs::types::{LocationSample, MagneticSample};

// ─── Mock backend ────────────────────────────────────────────────────────────

enum Behavior {
    Answer { x: f64, y: f64 },
    Status(u16),
    Malformed,
    Slow { delay_ms: u64, x: f64, y: f64 },
    SucceedOnce { x: f64, y: f64 },
}

#[derive(Clone)]
struct Backend {
    hits: Arc<AtomicU64>,
    behavior: Arc<Behavior>,
}

async fn predict(State(backend): State<Backend>, Json(_body): Json<serde_json::Value>) -> axum::response::Response {
    let hit = backend.hits.fetch_add(1, Ordering::SeqCst);

    match &*backend.behavior {
        Behavior::Answer { x, y } => Json(serde_json::json!({"x": x, "y": y})).into_response(),
        Behavior::Status(code) => StatusCode::from_u16(*code).unwrap().into_response(),
        Behavior::Malformed => Json(serde_json::json!({"x": "center", "y": 0.5})).into_response(),
        Behavior::Slow { delay_ms, x, y } => {
            sleep(Duration::from_millis(*delay_ms)).await;
            Json(serde_json::json!({"x": x, "y": y})).into_response()
        }
        Behavior::SucceedOnce { x, y } => {
            if hit == 0 {
                Json(serde_json::json!({"x": x, "y": y})).into_response()
            } else {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

async fn spawn_backend(behavior: Behavior) -> (String, Arc<AtomicU64>) {
    let hits = Arc::new(AtomicU64::new(0));
    let backend = Backend { hits: hits.clone(), behavior: Arc::new(behavior) };
    let app = Router::new().route("/predict", post(predict)).with_state(backend);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/predict", addr), hits)
}

// ─── Deterministic sensor sources ────────────────────────────────────────────

/// Delivers the fixed field {1, 2, 3} every 10 ms.
struct FixedMagnetometer;

impl MagnetometerSource for FixedMagnetometer {
    fn watch(&mut self, _interval: Duration) -> mpsc::Receiver<MagneticSample> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            loop {
                let sample = MagneticSample { timestamp_ms: 0, x: 1.0, y: 2.0, z: 3.0 };
                if tx.send(sample).await.is_err() {
                    break;
                }
                sleep(Duration::from_millis(10)).await;
            }
        });
        rx
    }
}

/// Delivers the fixed position {10.0, 20.0} every 20 ms.
struct FixedLocation;

impl LocationSource for FixedLocation {
    fn request_authorization(&mut self) -> impl Future<Output = Authorization> + Send {
        std::future::ready(Authorization::Granted)
    }

    fn watch(&mut self, _options: LocationOptions) -> mpsc::Receiver<LocationSample> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            loop {
                let fix = LocationSample { timestamp_ms: 0, latitude: 10.0, longitude: 20.0 };
                if tx.send(fix).await.is_err() {
                    break;
                }
                sleep(Duration::from_millis(20)).await;
            }
        });
        rx
    }
}

/// Grants authorization but never delivers a fix.
struct SilentLocation;

impl LocationSource for SilentLocation {
    fn request_authorization(&mut self) -> impl Future<Output = Authorization> + Send {
        std::future::ready(Authorization::Granted)
    }

    fn watch(&mut self, _options: LocationOptions) -> mpsc::Receiver<LocationSample> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let _tx = tx;
            std::future::pending::<()>().await;
        });
        rx
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn fast_config(endpoint: &str) -> TrackerConfig {
    TrackerConfig {
        endpoint: endpoint.to_string(),
        dispatch_period: Duration::from_millis(50),
        request_timeout: Duration::from_secs(30),
        ..TrackerConfig::default()
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool, timeout_ms: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_marker_centered_in_the_viewport() {
    let (endpoint, hits) = spawn_backend(Behavior::Answer { x: 0.5, y: 0.5 }).await;
    let mut tracker = PositionTracker::new(fast_config(&endpoint));
    tracker.set_destination("Room 101");
    tracker.report_layout(340.0, 500.0);

    tracker.activate(FixedMagnetometer, FixedLocation).await.unwrap();

    assert!(wait_for(|| tracker.marker_position().is_some(), 3000).await);
    assert!(hits.load(Ordering::SeqCst) >= 1);

    let marker = tracker.marker_position().unwrap();
    assert_relative_eq!(marker.x, 170.0);
    assert_relative_eq!(marker.y, 250.0);

    let overlay = tracker.overlay().unwrap();
    assert_relative_eq!(overlay.dot.cx, 170.0);
    assert_relative_eq!(overlay.dot.cy, 250.0);
    assert_relative_eq!(overlay.dot.radius, 10.0);
    assert_relative_eq!(overlay.halo.radius, 18.0);

    // A layout pass (rotation/resize) reprojects the stale answer.
    tracker.report_layout(680.0, 1000.0);
    let marker = tracker.marker_position().unwrap();
    assert_relative_eq!(marker.x, 340.0);
    assert_relative_eq!(marker.y, 500.0);

    tracker.deactivate().await;
}

#[tokio::test]
async fn server_error_leaves_no_marker_and_the_loop_keeps_ticking() {
    let (endpoint, hits) = spawn_backend(Behavior::Status(500)).await;
    let mut tracker = PositionTracker::new(fast_config(&endpoint));
    tracker.report_layout(340.0, 500.0);

    tracker.activate(FixedMagnetometer, FixedLocation).await.unwrap();

    // Two settled failures prove the in-flight flag cleared after the
    // first and the next tick was allowed to dispatch.
    assert!(wait_for(|| hits.load(Ordering::SeqCst) >= 2, 3000).await);
    assert!(wait_for(|| !tracker.status().request_in_flight, 1000).await);

    let status = tracker.status();
    assert!(status.failures >= 2);
    assert_eq!(status.dispatched, 0);
    assert!(tracker.marker_position().is_none());

    tracker.deactivate().await;
}

#[tokio::test]
async fn stale_marker_persists_across_later_failures() {
    let (endpoint, hits) = spawn_backend(Behavior::SucceedOnce { x: 0.5, y: 0.5 }).await;
    let mut tracker = PositionTracker::new(fast_config(&endpoint));
    tracker.report_layout(340.0, 500.0);

    tracker.activate(FixedMagnetometer, FixedLocation).await.unwrap();

    assert!(wait_for(|| tracker.marker_position().is_some(), 3000).await);
    assert!(wait_for(|| tracker.status().failures >= 2, 3000).await);

    // The answer from the one success is never cleared by the failures.
    let marker = tracker.marker_position().unwrap();
    assert_relative_eq!(marker.x, 170.0);
    assert_relative_eq!(marker.y, 250.0);
    assert_eq!(tracker.status().dispatched, 1);
    assert!(hits.load(Ordering::SeqCst) >= 3);

    tracker.deactivate().await;
}

#[tokio::test]
async fn malformed_body_is_discarded() {
    let (endpoint, hits) = spawn_backend(Behavior::Malformed).await;
    let mut tracker = PositionTracker::new(fast_config(&endpoint));
    tracker.report_layout(340.0, 500.0);

    tracker.activate(FixedMagnetometer, FixedLocation).await.unwrap();

    assert!(wait_for(|| tracker.status().failures >= 1, 3000).await);
    assert!(hits.load(Ordering::SeqCst) >= 1);
    assert!(tracker.marker_position().is_none());

    tracker.deactivate().await;
}

#[tokio::test]
async fn slow_backend_drops_ticks_instead_of_stacking_requests() {
    let (endpoint, hits) = spawn_backend(Behavior::Slow { delay_ms: 5000, x: 0.5, y: 0.5 }).await;
    let mut tracker = PositionTracker::new(fast_config(&endpoint));
    tracker.report_layout(340.0, 500.0);

    tracker.activate(FixedMagnetometer, FixedLocation).await.unwrap();

    assert!(wait_for(|| tracker.status().skipped_in_flight >= 2, 3000).await);
    assert_eq!(hits.load(Ordering::SeqCst), 1, "exactly one request on the wire");
    assert!(tracker.status().request_in_flight);

    // More ticks elapse; still only one request outstanding.
    sleep(Duration::from_millis(200)).await;
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Teardown aborts the outstanding request and clears the flag.
    tracker.deactivate().await;
    assert!(!tracker.status().request_in_flight);
    assert!(tracker.marker_position().is_none(), "aborted response is never applied");
}

#[tokio::test]
async fn denied_authorization_never_issues_a_request() {
    let (endpoint, hits) = spawn_backend(Behavior::Answer { x: 0.5, y: 0.5 }).await;
    let mut tracker = PositionTracker::new(fast_config(&endpoint));
    tracker.report_layout(340.0, 500.0);

    let location = SimulatedLocation {
        authorization: Authorization::Denied,
        ..SimulatedLocation::default()
    };
    let granted = tracker.activate(SimulatedMagnetometer, location).await.unwrap();
    assert_eq!(granted, Authorization::Denied);

    sleep(Duration::from_millis(300)).await;

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(tracker.status().ticks, 0);

    tracker.deactivate().await;
}

#[tokio::test]
async fn incomplete_state_issues_no_request() {
    let (endpoint, hits) = spawn_backend(Behavior::Answer { x: 0.5, y: 0.5 }).await;
    let mut tracker = PositionTracker::new(fast_config(&endpoint));
    tracker.report_layout(340.0, 500.0);

    // Magnetic samples flow, but no location fix ever arrives.
    tracker.activate(FixedMagnetometer, SilentLocation).await.unwrap();

    assert!(wait_for(|| tracker.status().skipped_incomplete >= 2, 3000).await);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(tracker.marker_position().is_none());

    tracker.deactivate().await;
}
