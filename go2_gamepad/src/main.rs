//! # go2 Gamepad Binary
//!
//! Subscribes to the wireless controller topic, smooths the sticks, tracks
//! button edges and counts `A` presses.
//!
//! # Usage
//!
//! ```bash
//! # Scripted controller on an in-process bus
//! go2_gamepad --simulate
//!
//! # Per-step stick and button state
//! go2_gamepad --simulate -v
//! ```

#![deny(warnings)]

use clap::Parser;
use go2_common::consts::GAMEPAD_CYCLE_US;
use go2_common::transport::{LocalBus, Subscriber};
use go2_gamepad::{Gamepad, GamepadRunner};
use go2_sim::{SimConfig, SimHarness, WirelessScript};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// go2 Gamepad - wireless controller input processing
#[derive(Parser, Debug)]
#[command(name = "go2_gamepad")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Smoothed sticks and button edges from the Go2 wireless controller")]
#[command(long_about = None)]
struct Args {
    /// Network interface the transport binds to
    #[arg(default_value = "lo")]
    network_interface: String,

    /// Stick smoothing factor in [0, 1]
    #[arg(long, default_value_t = 0.2)]
    smooth: f32,

    /// Stick deadzone threshold
    #[arg(long, default_value_t = 0.5)]
    dead_zone: f32,

    /// Processing period [µs]
    #[arg(long, default_value_t = GAMEPAD_CYCLE_US)]
    period_us: u64,

    /// Feed scripted controller frames from the simulator
    #[arg(short = 's', long)]
    simulate: bool,

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
    info!("go2 gamepad v{} starting...", env!("CARGO_PKG_VERSION"));

    if !args.simulate {
        return Err(format!(
            "no network transport for interface '{}' in this build; run with --simulate",
            args.network_interface
        )
        .into());
    }

    let runner = GamepadRunner::new(Gamepad::new(args.smooth, args.dead_zone))
        .with_period(Duration::from_micros(args.period_us));
    info!(
        smooth = runner.gamepad().smooth(),
        dead_zone = runner.gamepad().dead_zone(),
        period_us = runner.period().as_micros() as u64,
        "Gamepad configured"
    );

    let bus = LocalBus::new();
    let sim_config = SimConfig {
        wireless: Some(WirelessScript::default()),
        ..SimConfig::default()
    };
    bus.subscriber(&sim_config.wireless_topic)
        .subscribe(runner.handler())?;
    let raw = Arc::clone(runner.raw());
    let sim = SimHarness::attach(&bus, sim_config)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let handle = runner.spawn(running.clone())?;

    let deadline = args
        .duration_s
        .map(|s| Instant::now() + Duration::from_secs_f64(s.max(0.0)));
    while running.load(Ordering::SeqCst) && !handle.is_finished() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("Run duration elapsed");
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    running.store(false, Ordering::SeqCst);

    let runner = handle.join().map_err(|_| "gamepad thread panicked")?;
    sim.stop();

    info!(
        steps = runner.steps(),
        press_count = runner.press_count(),
        frames = raw.received(),
        rejected = raw.rejected(),
        "Gamepad statistics"
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
