use anyhow::Result;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use tokio::time::{sleep, Duration};

use indoor_nav_rs::config::TrackerConfig;
use indoor_nav_rs::platform::{Authorization, SimulatedLocation, SimulatedMagnetometer};
use indoor_nav_rs::projector::CoordinateSpace;
use indoor_nav_rs::tracker::PositionTracker;

#[derive(Parser, Debug)]
#[command(name = "indoor_nav")]
#[command(about = "Indoor positioning client loop - simulated sensors against a /predict backend", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Localization backend endpoint
    #[arg(long, default_value = "http://127.0.0.1:8000/predict")]
    endpoint: String,

    /// Dispatch period in milliseconds
    #[arg(long, default_value = "2000")]
    period_ms: u64,

    /// Destination label sent with each request
    #[arg(long, default_value = "")]
    room: String,

    /// Coordinate space of backend answers
    #[arg(long, value_enum, default_value = "normalized")]
    coordinates: CoordinateMode,

    /// Floor-plan native resolution, WxH (native mode only)
    #[arg(long, default_value = "1000x1500")]
    native_resolution: String,

    /// Initial rendered viewport, WxH
    #[arg(long, default_value = "340x500")]
    viewport: String,

    /// Output directory for status snapshots
    #[arg(long, default_value = "indoor_nav_sessions")]
    output_dir: String,

    /// Simulate a denied location permission
    #[arg(long)]
    deny_location: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CoordinateMode {
    Normalized,
    Native,
}

fn parse_dims(value: &str) -> Result<(f64, f64)> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| anyhow::anyhow!("expected WxH, got {:?}", value))?;
    Ok((w.trim().parse()?, h.trim().parse()?))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("[{}] Indoor Nav Starting", ts_now());
    println!("  Endpoint: {}", args.endpoint);
    println!("  Period: {} ms", args.period_ms);
    println!("  Duration: {} seconds (0=continuous)", args.duration);
    println!("  Coordinates: {:?}", args.coordinates);
    println!("  Output Dir: {}", args.output_dir);

    std::fs::create_dir_all(&args.output_dir)?;

    let (viewport_w, viewport_h) = parse_dims(&args.viewport)?;
    let coordinate_space = match args.coordinates {
        CoordinateMode::Normalized => CoordinateSpace::Normalized,
        CoordinateMode::Native => {
            let (width, height) = parse_dims(&args.native_resolution)?;
            CoordinateSpace::NativePixels { width, height }
        }
    };

    let config = TrackerConfig {
        endpoint: args.endpoint.clone(),
        dispatch_period: Duration::from_millis(args.period_ms),
        coordinate_space,
        ..TrackerConfig::default()
    };

    let mut tracker = PositionTracker::new(config);
    tracker.set_destination(args.room.clone());
    tracker.report_layout(viewport_w, viewport_h);

    let location = SimulatedLocation {
        authorization: if args.deny_location {
            Authorization::Denied
        } else {
            Authorization::Granted
        },
        ..SimulatedLocation::default()
    };

    let authorization = tracker.activate(SimulatedMagnetometer, location).await?;
    println!("[{}] Location permission: {:?}", ts_now(), authorization);

    let start = Utc::now();

    loop {
        sleep(Duration::from_secs(2)).await;

        let status = tracker.status();
        match status.marker {
            Some(marker) => println!(
                "[{}] marker ({:.1}, {:.1}) px | {} mag samples, {} fixes, {} dispatched, {} failed",
                ts_now(),
                marker.x,
                marker.y,
                status.magnetic_samples,
                status.location_fixes,
                status.dispatched,
                status.failures
            ),
            None => println!(
                "[{}] no marker yet | {} mag samples, {} fixes, {} dispatched, {} failed",
                ts_now(),
                status.magnetic_samples,
                status.location_fixes,
                status.dispatched,
                status.failures
            ),
        }

        let status_path = format!("{}/live_status.json", args.output_dir);
        let _ = status.save(&status_path);

        if args.duration > 0 {
            let elapsed = Utc::now().signed_duration_since(start);
            if elapsed.num_seconds() as u64 >= args.duration {
                println!("[{}] Duration reached, stopping...", ts_now());
                break;
            }
        }
    }

    tracker.deactivate().await;

    let final_status = tracker.status();
    let final_path = format!("{}/live_status_final.json", args.output_dir);
    final_status.save(&final_path)?;
    println!(
        "\n=== Final Stats ===\nTicks: {}\nDispatched: {}\nSkipped (incomplete): {}\nSkipped (in flight): {}\nFailures: {}",
        final_status.ticks,
        final_status.dispatched,
        final_status.skipped_incomplete,
        final_status.skipped_in_flight,
        final_status.failures
    );

    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
