//! Integration test: spawned control thread against the simulator thread,
//! wired exactly like the binary's `--simulate` mode.

use go2_common::transport::{LocalBus, Subscriber};
use go2_common::wire::LowState;
use go2_control_unit::cache::SnapshotCache;
use go2_control_unit::config::ControlUnitConfig;
use go2_control_unit::cycle::CycleRunner;
use go2_sim::{SimConfig, SimHarness};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[test]
fn test_threaded_loop_drives_simulator() {
    let config = ControlUnitConfig::default();
    let bus = LocalBus::new();
    let sim = SimHarness::attach(
        &bus,
        SimConfig {
            lowcmd_topic: config.topics.lowcmd.clone(),
            lowstate_topic: config.topics.lowstate.clone(),
            ..SimConfig::default()
        },
    )
    .expect("simulator");

    let cache = Arc::new(SnapshotCache::new(LowState::default()));
    bus.subscriber(&config.topics.lowstate)
        .subscribe(cache.handler())
        .expect("subscribe");

    let runner = CycleRunner::new(
        config.trajectory.clone(),
        Duration::from_micros(config.cycle_time_us),
        Arc::clone(&cache),
        bus.publisher(&config.topics.lowcmd),
    )
    .expect("runner");

    let running = Arc::new(AtomicBool::new(true));
    let handle = runner.spawn(running.clone(), None).expect("spawn");

    std::thread::sleep(Duration::from_millis(1500));
    running.store(false, Ordering::SeqCst);
    let stats = handle.join().expect("join").expect("loop result");
    let robot = sim.robot();
    let sim_stats = sim.stop();

    assert!(stats.cycle_count > 100, "cycles: {}", stats.cycle_count);
    assert_eq!(stats.publish_failures, 0);
    assert_eq!(sim_stats.accepted, stats.cycle_count);
    assert_eq!(sim_stats.rejected(), 0);
    assert!(cache.update_count() > 100);
    assert_eq!(cache.rejected_count(), 0);

    // The calf has left the lying pose; the thigh was never commanded.
    let calf = robot.joint(2).expect("slot 2").q;
    assert!(calf > -2.5, "calf q = {calf}");
    assert_eq!(robot.joint(1).expect("slot 1").q, 1.36f32 as f64);
}

#[test]
fn test_bus_shutdown_counts_failures_without_stopping() {
    let config = ControlUnitConfig::default();
    let bus = LocalBus::new();
    let cache = Arc::new(SnapshotCache::new(LowState::default()));
    let runner = CycleRunner::new(
        config.trajectory.clone(),
        Duration::from_micros(config.cycle_time_us),
        cache,
        bus.publisher(&config.topics.lowcmd),
    )
    .expect("runner");

    let running = Arc::new(AtomicBool::new(true));
    let handle = runner.spawn(running.clone(), None).expect("spawn");
    std::thread::sleep(Duration::from_millis(50));
    bus.close();
    std::thread::sleep(Duration::from_millis(50));
    assert!(!handle.is_finished());

    running.store(false, Ordering::SeqCst);
    let stats = handle.join().expect("join").expect("loop result");
    assert!(stats.publish_failures > 0);
    assert!(stats.publish_failures < stats.cycle_count);
}
