//! # go2 Control Unit
//!
//! Drives the commanded Go2 joints through the bootstrap → ramp → oscillate
//! trajectory at a fixed period.
//!
//! The DDS transport to real hardware is provided outside this workspace;
//! with `--simulate` the loop runs against the in-process simulated robot
//! from `go2_sim` over a [`LocalBus`].

use clap::Parser;
use go2_common::config::LogLevel;
use go2_common::transport::{LocalBus, Subscriber};
use go2_common::wire::LowState;
use go2_control_unit::cache::SnapshotCache;
use go2_control_unit::config::{ControlUnitConfig, load_config};
use go2_control_unit::cycle::{CycleRunner, RtPlacement};
use go2_sim::{SimConfig, SimHarness};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// go2 Control Unit: low-level joint control loop
#[derive(Parser, Debug)]
#[command(name = "go2_control_unit")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Fixed-period LowCmd control loop for the Go2")]
struct Args {
    /// Network interface the robot is reachable on (e.g. enp3s0).
    #[arg(default_value = "lo")]
    network_interface: String,

    /// Path to the control unit TOML configuration.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run against the in-process simulated robot.
    #[arg(long)]
    simulate: bool,

    /// CPU core to pin the control thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[arg(long, value_name = "SECONDS")]
    duration_s: Option<f64>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = args.config.as_deref().map(load_config).transpose();
    let log_level = match &config {
        Ok(Some(c)) => c.shared.log_level,
        _ => LogLevel::Info,
    };
    setup_tracing(&args, log_level);

    info!("go2 Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match config {
        Ok(Some(c)) => c,
        Ok(None) => {
            info!("No --config given, using built-in defaults");
            ControlUnitConfig::default()
        }
        Err(e) => {
            error!("FATAL: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(&args, &config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("go2 Control Unit shutdown complete");
}

fn run(args: &Args, config: &ControlUnitConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        service = %config.shared.service_name,
        interface = %args.network_interface,
        cycle_time_us = config.cycle_time_us,
        "Config OK"
    );

    if !args.simulate {
        return Err(format!(
            "no network transport for interface '{}' in this build; run with --simulate",
            args.network_interface
        )
        .into());
    }

    let bus = LocalBus::new();
    let sim = SimHarness::attach(
        &bus,
        SimConfig {
            lowcmd_topic: config.topics.lowcmd.clone(),
            lowstate_topic: config.topics.lowstate.clone(),
            ..SimConfig::default()
        },
    )?;
    info!("Simulated robot attached");

    let cache = Arc::new(SnapshotCache::new(LowState::default()));
    bus.subscriber(&config.topics.lowstate)
        .subscribe(cache.handler())?;

    let runner = CycleRunner::new(
        config.trajectory.clone(),
        Duration::from_micros(config.cycle_time_us),
        Arc::clone(&cache),
        bus.publisher(&config.topics.lowcmd),
    )?;

    // Setup signal handler for graceful shutdown.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let handle = runner.spawn(
        running.clone(),
        Some(RtPlacement {
            cpu_core: args.cpu_core,
            priority: args.rt_priority,
        }),
    )?;

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

    let stats = handle
        .join()
        .map_err(|_| "control thread panicked")??;
    let sim_stats = sim.stop();

    info!(
        cycles = stats.cycle_count,
        overruns = stats.overruns,
        publish_failures = stats.publish_failures,
        avg_body_us = stats.avg_body_ns() / 1000,
        max_body_us = stats.body_max_ns / 1000,
        snapshots = cache.update_count(),
        sim_frames_accepted = sim_stats.accepted,
        sim_frames_rejected = sim_stats.rejected(),
        "Control loop statistics"
    );
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(configured.as_directive()))
    };

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
