//! Integration test: control cycle and simulated robot in lockstep.
//!
//! Each iteration steps the plant by one period, feeds its `LowState` into
//! the snapshot cache and runs one control tick whose `LowCmd` reaches the
//! robot through the bus. No threads, so results are deterministic.

use go2_common::consts::{NUM_MOTOR, TOPIC_LOWCMD};
use go2_common::crc::verify_frame;
use go2_common::transport::{LocalBus, LocalPublisher, Subscriber};
use go2_common::wire::{LowCmd, LowState};
use go2_control_unit::cache::SnapshotCache;
use go2_control_unit::cycle::CycleRunner;
use go2_control_unit::trajectory::{TrajectoryPhase, TrajectoryParams};
use go2_sim::robot::{LYING_LEG_POSE, lying_pose};
use go2_sim::{JointModel, SimulatedRobot};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const PERIOD: Duration = Duration::from_millis(2);

struct Rig {
    robot: Arc<Mutex<SimulatedRobot>>,
    cache: Arc<SnapshotCache<LowState>>,
    runner: CycleRunner<LocalPublisher>,
    frames: Arc<Mutex<Vec<LowCmd>>>,
}

impl Rig {
    fn new(params: TrajectoryParams) -> Self {
        let bus = LocalBus::new();
        let robot = Arc::new(Mutex::new(SimulatedRobot::new(
            JointModel::default(),
            &lying_pose(),
        )));
        let frames = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&robot);
        let log = Arc::clone(&frames);
        bus.subscriber(TOPIC_LOWCMD)
            .subscribe(Arc::new(move |frame: &[u8]| {
                assert!(verify_frame(frame), "LowCmd with bad CRC");
                sink.lock().apply_frame(frame).expect("frame accepted");
                log.lock().push(LowCmd::decode(frame).expect("decode"));
            }))
            .unwrap();

        let cache = Arc::new(SnapshotCache::new(LowState::default()));
        let runner =
            CycleRunner::new(params, PERIOD, Arc::clone(&cache), bus.publisher(TOPIC_LOWCMD))
                .expect("runner");
        Self {
            robot,
            cache,
            runner,
            frames,
        }
    }

    fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            let state = {
                let mut robot = self.robot.lock();
                robot.step(PERIOD);
                robot.state()
            };
            self.cache.update(state);
            self.runner.tick().expect("publish");
        }
    }

    fn q(&self, slot: usize) -> f64 {
        self.robot.lock().joint(slot).map_or(f64::NAN, |j| j.q)
    }
}

#[test]
fn test_commanded_joint_settles_at_neutral() {
    let mut rig = Rig::new(TrajectoryParams {
        ramp_end: 2000,
        oscillate_start: 2000,
        ..TrajectoryParams::default()
    });
    rig.run(1500);

    assert_eq!(rig.runner.trajectory().phase(), TrajectoryPhase::Ramp);
    assert!((rig.q(2) + 2.0).abs() < 1e-3, "calf q = {}", rig.q(2));
    // Tracked but uncommanded joints never receive a command.
    assert_eq!(rig.q(1), LYING_LEG_POSE[1] as f64);
    assert_eq!(rig.q(0), LYING_LEG_POSE[0] as f64);
}

#[test]
fn test_bootstrap_captures_lying_pose() {
    let mut rig = Rig::new(TrajectoryParams::default());
    rig.run(25);
    let init = rig.runner.trajectory().initial_positions();
    assert_eq!(init, &LYING_LEG_POSE);
}

#[test]
fn test_every_frame_keeps_untracked_slots_on_hold() {
    let mut rig = Rig::new(TrajectoryParams::default());
    rig.run(600);

    let frames = rig.frames.lock();
    assert_eq!(frames.len(), 600);
    for frame in frames.iter() {
        for slot in (0..NUM_MOTOR).filter(|&s| s != 2) {
            assert!(frame.motor_cmd[slot].is_hold(), "slot {slot} commanded");
        }
    }
    // Bootstrap frames (ticks 1..10) carry no command for the calf either.
    assert!(frames[..9].iter().all(|f| f.motor_cmd[2].is_hold()));
    assert!(!frames[9].motor_cmd[2].is_hold());
}

#[test]
fn test_oscillation_stays_within_envelope() {
    let mut rig = Rig::new(TrajectoryParams::default());
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for _ in 0..3000 {
        rig.run(1);
        let q = rig.q(2);
        lo = lo.min(q);
        hi = hi.max(q);
    }
    assert_eq!(rig.runner.trajectory().phase(), TrajectoryPhase::Oscillate);
    // neutral -2.0, amplitude 0.9
    assert!(lo >= -3.0 && hi <= -1.0, "range [{lo}, {hi}]");
    assert!(hi - lo > 0.5, "joint barely moved: [{lo}, {hi}]");
}
