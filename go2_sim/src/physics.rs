//! Joint plant driven by the firmware's PD law.
//!
//! Each motor slot is a rigid unit with rotor inertia and viscous damping.
//! The commanded torque follows the motor firmware:
//!
//! ```text
//! tau = tau_ff + kp * (q_des - q) + kd * (dq_des - dq)
//! ```
//!
//! where the position term is dropped when `q_des == POS_STOP_F` and the
//! velocity term when `dq_des == VEL_STOP_F`. Slots outside servo mode
//! produce no torque.

use go2_common::consts::{POS_STOP_F, SERVO_MODE, VEL_STOP_F};
use go2_common::wire::MotorCmd;

/// Mechanical parameters shared by every simulated joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointModel {
    /// Reflected inertia [kg·m²].
    pub inertia: f64,
    /// Viscous damping [N·m·s/rad].
    pub damping: f64,
    /// Saturation of the commanded torque [N·m].
    pub torque_limit: f64,
}

impl Default for JointModel {
    fn default() -> Self {
        Self {
            inertia: 0.05,
            damping: 0.2,
            torque_limit: 45.0,
        }
    }
}

/// Integrated state of one joint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JointSim {
    pub q: f64,
    pub dq: f64,
    pub ddq: f64,
    /// Torque applied during the last step [N·m].
    pub tau: f64,
}

impl JointSim {
    pub fn at(q: f64) -> Self {
        Self {
            q,
            ..Self::default()
        }
    }

    /// Torque the firmware would apply for `cmd` in the current state.
    pub fn commanded_torque(&self, cmd: &MotorCmd, model: &JointModel) -> f64 {
        if cmd.mode != SERVO_MODE {
            return 0.0;
        }
        let mut tau = cmd.tau as f64;
        if cmd.q != POS_STOP_F {
            tau += cmd.kp as f64 * (cmd.q as f64 - self.q);
        }
        if cmd.dq != VEL_STOP_F {
            tau += cmd.kd as f64 * (cmd.dq as f64 - self.dq);
        }
        if tau.is_finite() {
            tau.clamp(-model.torque_limit, model.torque_limit)
        } else {
            0.0
        }
    }

    /// Advance by `dt` seconds (semi-implicit Euler).
    pub fn step(&mut self, cmd: &MotorCmd, model: &JointModel, dt: f64) {
        let tau = self.commanded_torque(cmd, model);
        self.ddq = (tau - model.damping * self.dq) / model.inertia;
        self.dq += self.ddq * dt;
        self.q += self.dq * dt;
        self.tau = tau;
    }
}
