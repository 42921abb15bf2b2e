//! Simulator integration tests: frame validation, plant behaviour and the
//! bus-attached harness.

use go2_common::consts::{NUM_MOTOR, POS_STOP_F, TOPIC_LOWCMD, TOPIC_LOWSTATE};
use go2_common::crc::verify_frame;
use go2_common::transport::{LocalBus, Publisher, Subscriber};
use go2_common::wire::{LowCmd, LowState, MotorCmd};
use go2_sim::{JointModel, JointSim, SimConfig, SimHarness, SimulatedRobot};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn wait_for(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn test_tick_counts_simulated_milliseconds() {
    let mut robot = SimulatedRobot::new(JointModel::default(), &[0.0; NUM_MOTOR]);
    for _ in 0..250 {
        robot.step(Duration::from_millis(2));
    }
    assert_eq!(robot.state().tick, 500);
    assert_eq!(robot.elapsed(), Duration::from_millis(500));
}

#[test]
fn test_last_valid_command_stays_in_effect() {
    let mut robot = SimulatedRobot::new(JointModel::default(), &[0.0; NUM_MOTOR]);
    let mut cmd = LowCmd::new();
    cmd.motor_cmd[4] = MotorCmd {
        q: 0.4,
        dq: 0.0,
        kp: 5.0,
        kd: 1.0,
        ..MotorCmd::hold()
    };
    robot.apply_frame(&cmd.encode_with_crc()).unwrap();

    let mut bad = cmd.encode();
    bad[40] ^= 0xFF;
    assert!(robot.apply_frame(&bad).is_err());

    assert_eq!(robot.command().motor_cmd[4].q, 0.4);
    assert_eq!(robot.stats().accepted, 1);
    assert_eq!(robot.stats().rejected(), 1);
}

#[test]
fn test_state_reports_command_mode_and_torque() {
    let mut robot = SimulatedRobot::new(JointModel::default(), &[0.0; NUM_MOTOR]);
    let mut cmd = LowCmd::new();
    cmd.motor_cmd[0] = MotorCmd {
        q: POS_STOP_F,
        dq: 0.0,
        tau: 1.5,
        ..MotorCmd::hold()
    };
    robot.apply_frame(&cmd.encode_with_crc()).unwrap();
    robot.step(Duration::from_millis(2));

    let state = robot.state();
    assert_eq!(state.motor_state[0].mode, 0x01);
    assert_eq!(state.motor_state[0].tau_est, 1.5);
    assert!(state.motor_state[0].dq > 0.0);
    assert_eq!(state.motor_state[1].tau_est, 0.0);
}

#[test]
fn test_closed_loop_over_bus() {
    let bus = LocalBus::new();
    let last = Arc::new(Mutex::new(LowState::default()));
    let sink = Arc::clone(&last);
    bus.subscriber(TOPIC_LOWSTATE)
        .subscribe(Arc::new(move |frame: &[u8]| {
            if verify_frame(frame)
                && let Ok(state) = LowState::decode(frame)
            {
                *sink.lock() = state;
            }
        }))
        .unwrap();

    let sim = SimHarness::attach(&bus, SimConfig::default()).unwrap();
    let publisher = bus.publisher(TOPIC_LOWCMD);

    let mut cmd = LowCmd::new();
    cmd.motor_cmd[2] = MotorCmd {
        q: -2.0,
        dq: 0.0,
        kp: 5.0,
        kd: 1.0,
        ..MotorCmd::hold()
    };
    publisher.publish(&cmd.encode_with_crc()).unwrap();

    assert!(wait_for(|| (last.lock().motor_state[2].q + 2.0).abs() < 0.05));
    // Uncommanded slots stay in the lying pose.
    assert_eq!(last.lock().motor_state[1].q, 1.36);

    let stats = sim.stop();
    assert_eq!(stats.accepted, 1);
    assert_eq!(stats.rejected(), 0);
}

proptest! {
    #[test]
    fn prop_torque_never_exceeds_limit(
        q in -10.0f64..10.0,
        dq in -50.0f64..50.0,
        target in -10.0f32..10.0,
        kp in 0.0f32..500.0,
        kd in 0.0f32..50.0,
        tau in -100.0f32..100.0,
    ) {
        let model = JointModel::default();
        let joint = JointSim { q, dq, ..JointSim::default() };
        let cmd = MotorCmd { q: target, dq: 0.0, tau, kp, kd, ..MotorCmd::hold() };
        let applied = joint.commanded_torque(&cmd, &model);
        prop_assert!(applied.abs() <= model.torque_limit);
    }

    #[test]
    fn prop_hold_slots_never_move(q0 in -3.0f32..3.0, steps in 1usize..500) {
        let mut initial = [0.0; NUM_MOTOR];
        initial[7] = q0;
        let mut robot = SimulatedRobot::new(JointModel::default(), &initial);
        for _ in 0..steps {
            robot.step(Duration::from_millis(2));
        }
        prop_assert_eq!(robot.state().motor_state[7].q, q0);
    }
}
