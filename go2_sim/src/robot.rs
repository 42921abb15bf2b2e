//! Simulated robot: LowCmd in, LowState out.

use go2_common::consts::{LOWCMD_HEAD, NUM_MOTOR};
use go2_common::transport::TransportError;
use go2_common::wire::{LOWCMD_SIZE, LowCmd, LowState, WireError, check_crc};
use std::time::Duration;
use thiserror::Error;

use crate::physics::{JointModel, JointSim};

/// Errors raised by the simulator.
#[derive(Debug, Error)]
pub enum SimError {
    /// Received command frame has the wrong length.
    #[error("LowCmd frame has {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    /// Received command frame failed CRC or decoding.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Bus refused a subscription or a frame.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Simulator thread could not be started.
    #[error("failed to spawn simulator thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Frame and step counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    pub accepted: u64,
    pub rejected_size: u64,
    pub rejected_crc: u64,
    pub steps: u64,
}

impl SimStats {
    pub fn rejected(&self) -> u64 {
        self.rejected_size + self.rejected_crc
    }
}

/// Go2 lying pose per leg: hip, thigh, calf [rad].
pub const LYING_LEG_POSE: [f32; 3] = [0.0, 1.36, -2.65];

/// Lying pose on the 12 physical slots, zero elsewhere.
pub fn lying_pose() -> [f32; NUM_MOTOR] {
    let mut q = [0.0; NUM_MOTOR];
    for leg in q.chunks_mut(3).take(4) {
        leg.copy_from_slice(&LYING_LEG_POSE);
    }
    q
}

/// Twenty PD joints commanded by the last accepted `LowCmd`.
#[derive(Debug, Clone)]
pub struct SimulatedRobot {
    joints: [JointSim; NUM_MOTOR],
    model: JointModel,
    command: LowCmd,
    elapsed: Duration,
    stats: SimStats,
}

impl SimulatedRobot {
    /// Robot at rest in `initial_q`, holding every slot until the first
    /// valid command arrives.
    pub fn new(model: JointModel, initial_q: &[f32; NUM_MOTOR]) -> Self {
        Self {
            joints: initial_q.map(|q| JointSim::at(q as f64)),
            model,
            command: LowCmd::new(),
            elapsed: Duration::ZERO,
            stats: SimStats::default(),
        }
    }

    /// Validate and adopt a received command frame.
    ///
    /// # Errors
    /// `SimError::FrameSize` or `SimError::Wire` (CRC mismatch); the
    /// previous command stays in effect.
    pub fn apply_frame(&mut self, frame: &[u8]) -> Result<(), SimError> {
        if frame.len() != LOWCMD_SIZE {
            self.stats.rejected_size += 1;
            return Err(SimError::FrameSize {
                expected: LOWCMD_SIZE,
                actual: frame.len(),
            });
        }
        if let Err(e) = check_crc(frame) {
            self.stats.rejected_crc += 1;
            return Err(e.into());
        }
        self.command = LowCmd::decode(frame)?;
        self.stats.accepted += 1;
        Ok(())
    }

    /// Integrate every joint by `dt` under the current command.
    pub fn step(&mut self, dt: Duration) {
        let dt_s = dt.as_secs_f64();
        for (joint, cmd) in self.joints.iter_mut().zip(&self.command.motor_cmd) {
            joint.step(cmd, &self.model, dt_s);
        }
        self.elapsed += dt;
        self.stats.steps += 1;
    }

    /// Sensor frame for the current state (CRC not yet stamped).
    pub fn state(&self) -> LowState {
        let mut state = LowState::default();
        state.header.head = LOWCMD_HEAD;
        state.tick = self.elapsed.as_millis() as u32;
        state.imu_state.quaternion = [1.0, 0.0, 0.0, 0.0];
        state.imu_state.accelerometer = [0.0, 0.0, 9.81];
        state.imu_state.temperature = 35;
        state.bms_state.soc = 100;
        state.power_v = 28.8;

        for ((out, joint), cmd) in state
            .motor_state
            .iter_mut()
            .zip(&self.joints)
            .zip(&self.command.motor_cmd)
        {
            out.mode = cmd.mode;
            out.q = joint.q as f32;
            out.dq = joint.dq as f32;
            out.ddq = joint.ddq as f32;
            out.tau_est = joint.tau as f32;
            out.q_raw = out.q;
            out.dq_raw = out.dq;
            out.ddq_raw = out.ddq;
            out.temperature = 30;
        }
        state
    }

    pub fn joint(&self, slot: usize) -> Option<&JointSim> {
        self.joints.get(slot)
    }

    /// Last accepted command.
    pub fn command(&self) -> &LowCmd {
        &self.command
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }
}
