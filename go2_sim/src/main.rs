//! # go2 Simulator Binary
//!
//! Runs the simulated robot on an in-process bus with a built-in observer
//! that logs the published `LowState`. Useful for checking the plant and
//! the wire codecs without the control unit attached.
//!
//! # Usage
//!
//! ```bash
//! # Stream LowState at 500 Hz for ten seconds
//! go2_sim --duration-s 10
//!
//! # Also publish scripted gamepad frames, JSON logs
//! go2_sim --wireless --json
//! ```

#![deny(warnings)]

use clap::Parser;
use go2_common::transport::{LocalBus, Subscriber};
use go2_common::wire::{LowState, WirelessController};
use go2_sim::{SimConfig, SimHarness, WirelessScript};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

/// go2 Simulator - simulated Go2 low-level interface
#[derive(Parser, Debug)]
#[command(name = "go2_sim")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Simulated Go2 low-level interface: consumes LowCmd, publishes LowState")]
#[command(long_about = None)]
struct Args {
    /// Simulation step and LowState publish period [µs]
    #[arg(long, default_value_t = 2000)]
    period_us: u64,

    /// Publish scripted WirelessController frames
    #[arg(long)]
    wireless: bool,

    /// Stop after this many seconds (runs until Ctrl-C otherwise)
    #[arg(long)]
    duration_s: Option<f64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    if let Err(e) = run(args) {
        error!("FATAL: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    info!("go2 simulator v{} starting...", env!("CARGO_PKG_VERSION"));
    if args.period_us == 0 {
        return Err("period_us must be > 0".into());
    }

    let config = SimConfig {
        period: Duration::from_micros(args.period_us),
        wireless: args.wireless.then(WirelessScript::default),
        ..SimConfig::default()
    };

    let bus = LocalBus::new();
    let latest = Arc::new(Mutex::new(LowState::default()));
    let sink = Arc::clone(&latest);
    bus.subscriber(&config.lowstate_topic)
        .subscribe(Arc::new(move |frame: &[u8]| {
            if let Ok(state) = LowState::decode(frame) {
                *sink.lock() = state;
            }
        }))?;

    let presses = Arc::new(AtomicU64::new(0));
    if args.wireless {
        let counter = Arc::clone(&presses);
        bus.subscriber(&config.wireless_topic)
            .subscribe(Arc::new(move |frame: &[u8]| {
                if let Ok(pad) = WirelessController::decode(frame) {
                    debug!(lx = pad.lx, keys = pad.keys, "WirelessController");
                    if pad.keys != 0 {
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }))?;
    }

    let sim = SimHarness::attach(&bus, config)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let deadline = args
        .duration_s
        .map(|s| Instant::now() + Duration::from_secs_f64(s.max(0.0)));
    let mut next_report = Instant::now();
    while running.load(Ordering::SeqCst) && sim.is_running() {
        let now = Instant::now();
        if deadline.is_some_and(|d| now >= d) {
            info!("Run duration elapsed");
            break;
        }
        if now >= next_report {
            let state = *latest.lock();
            info!(
                tick_ms = state.tick,
                fr_calf_q = state.motor_state[2].q,
                "LowState"
            );
            next_report = now + Duration::from_secs(1);
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let stats = sim.stop();
    info!(
        steps = stats.steps,
        accepted = stats.accepted,
        rejected = stats.rejected(),
        wireless_pressed_frames = presses.load(Ordering::Relaxed),
        "Simulator statistics"
    );
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
