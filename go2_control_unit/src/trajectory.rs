//! Trajectory state machine: bootstrap → ramp to neutral → oscillate.
//!
//! Driven by a tick counter incremented once per call. Phase windows are
//! expressed in ticks and may overlap; in the default schedule the ramp
//! starts at tick 10 while initial positions are still being captured up to
//! tick 19, and both phases run on those ticks in that order.
//!
//! ```text
//! tick   1 ........ 10 ........ 20 ................ 400 ──────────▶
//!        │ bootstrap (capture q)  │
//!                   │ ramp (progress / ramp_ticks)   │
//!                                                    │ oscillate
//! ```
//!
//! Oscillation time is `osc_count * dt`, derived from ticks rather than the
//! wall clock, so scheduler jitter changes only the real-time cadence of the
//! waveform, not its shape.

use go2_common::consts::{CONTROL_DT, NUM_MOTOR};
use go2_common::wire::LowState;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::info;

// ─── Parameters ─────────────────────────────────────────────────────

/// One joint followed by the trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedJoint {
    /// Motor slot index in `LowCmd` / `LowState`.
    pub slot: usize,
    /// Centre of the oscillation and end point of the ramp [rad].
    pub neutral: f32,
    /// Signed oscillation amplitude [rad].
    #[serde(default)]
    pub amplitude: f32,
    /// Whether the target is written into the outgoing command.
    #[serde(default)]
    pub commanded: bool,
}

/// Phase windows, gains and the joints to drive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryParams {
    /// Initial positions are captured while `tick < bootstrap_ticks`.
    pub bootstrap_ticks: u64,
    /// First tick of the ramp window.
    pub ramp_start: u64,
    /// End (exclusive) of the ramp window.
    pub ramp_end: u64,
    /// Ramp progress ticks needed to reach the neutral pose.
    pub ramp_ticks: u64,
    /// First tick of the oscillation.
    pub oscillate_start: u64,
    pub frequency_hz: f64,
    /// Nominal timestep used for oscillation time [s].
    pub dt: f64,
    pub kp: f32,
    pub kd: f32,
    pub joints: Vec<TrackedJoint>,
}

impl Default for TrajectoryParams {
    fn default() -> Self {
        Self {
            bootstrap_ticks: 20,
            ramp_start: 10,
            ramp_end: 400,
            ramp_ticks: 200,
            oscillate_start: 400,
            frequency_hz: 1.0,
            dt: CONTROL_DT,
            kp: 5.0,
            kd: 1.0,
            joints: vec![
                TrackedJoint {
                    slot: 0,
                    neutral: 0.0,
                    amplitude: 0.0,
                    commanded: false,
                },
                TrackedJoint {
                    slot: 1,
                    neutral: 1.2,
                    amplitude: 0.6,
                    commanded: false,
                },
                TrackedJoint {
                    slot: 2,
                    neutral: -2.0,
                    amplitude: -0.9,
                    commanded: true,
                },
            ],
        }
    }
}

impl TrajectoryParams {
    /// Check window ordering, timing and joint slots.
    ///
    /// # Errors
    /// Human-readable reason for the first violated rule.
    pub fn validate(&self) -> Result<(), String> {
        if self.bootstrap_ticks < 2 {
            return Err(format!(
                "bootstrap_ticks {} must be at least 2 (first evaluated tick is 1)",
                self.bootstrap_ticks
            ));
        }
        if self.ramp_start >= self.ramp_end {
            return Err(format!(
                "ramp window [{}, {}) is empty",
                self.ramp_start, self.ramp_end
            ));
        }
        if self.ramp_end > self.oscillate_start {
            return Err(format!(
                "ramp_end {} overlaps oscillate_start {}",
                self.ramp_end, self.oscillate_start
            ));
        }
        if self.ramp_ticks == 0 {
            return Err("ramp_ticks must be > 0".to_string());
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(format!("dt {} must be a positive number", self.dt));
        }
        if !(self.frequency_hz.is_finite() && self.frequency_hz >= 0.0) {
            return Err(format!("frequency_hz {} must be >= 0", self.frequency_hz));
        }
        if !(self.kp >= 0.0 && self.kd >= 0.0) {
            return Err(format!("gains kp={} kd={} must be >= 0", self.kp, self.kd));
        }

        let mut seen = [false; NUM_MOTOR];
        for joint in &self.joints {
            if joint.slot >= NUM_MOTOR {
                return Err(format!(
                    "joint slot {} out of range [0, {})",
                    joint.slot, NUM_MOTOR
                ));
            }
            if seen[joint.slot] {
                return Err(format!("duplicate joint slot {}", joint.slot));
            }
            seen[joint.slot] = true;
            if !(joint.neutral.is_finite() && joint.amplitude.is_finite()) {
                return Err(format!("joint slot {} has a non-finite pose", joint.slot));
            }
        }
        if !self.joints.iter().any(|j| j.commanded) {
            return Err("at least one joint must be commanded".to_string());
        }
        Ok(())
    }
}

// ─── Interpolation ──────────────────────────────────────────────────

/// Linear interpolation between two joint positions.
///
/// `rate` is clamped to `[0, 1]`, so out-of-range rates return the nearest
/// end point.
#[inline]
pub fn joint_linear_interpolation(init: f64, target: f64, rate: f64) -> f64 {
    let rate = rate.clamp(0.0, 1.0);
    init * (1.0 - rate) + target * rate
}

// ─── State Machine ──────────────────────────────────────────────────

/// Phase reported for the most recent tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrajectoryPhase {
    /// Capturing initial positions only.
    Bootstrap,
    /// Interpolating toward the neutral pose.
    Ramp,
    /// Sinusoid around the neutral pose.
    Oscillate,
    /// Between windows; last targets are kept.
    Hold,
}

/// Desired state for one tracked joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointTarget {
    pub slot: usize,
    pub commanded: bool,
    pub q: f32,
    pub dq: f32,
    pub kp: f32,
    pub kd: f32,
    pub tau: f32,
}

/// Tick-driven trajectory generator.
///
/// All buffers are sized at construction; [`TrajectoryGenerator::step`]
/// does not allocate.
#[derive(Debug, Clone)]
pub struct TrajectoryGenerator {
    params: TrajectoryParams,
    tick: u64,
    ramp_progress: u64,
    osc_count: u64,
    q_init: Vec<f32>,
    targets: Vec<JointTarget>,
    active: bool,
    phase: TrajectoryPhase,
}

impl TrajectoryGenerator {
    pub fn new(params: TrajectoryParams) -> Self {
        let q_init = vec![0.0; params.joints.len()];
        let targets = params
            .joints
            .iter()
            .map(|j| JointTarget {
                slot: j.slot,
                commanded: j.commanded,
                q: 0.0,
                dq: 0.0,
                kp: 0.0,
                kd: 0.0,
                tau: 0.0,
            })
            .collect();
        Self {
            params,
            tick: 0,
            ramp_progress: 0,
            osc_count: 0,
            q_init,
            targets,
            active: false,
            phase: TrajectoryPhase::Bootstrap,
        }
    }

    pub fn params(&self) -> &TrajectoryParams {
        &self.params
    }

    /// Ticks evaluated so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn phase(&self) -> TrajectoryPhase {
        self.phase
    }

    /// Positions captured during bootstrap, in joint order.
    pub fn initial_positions(&self) -> &[f32] {
        &self.q_init
    }

    /// Advance one tick against the latest sensor snapshot.
    ///
    /// Returns `None` until the first ramp or oscillation tick, then the
    /// current targets of every tracked joint.
    pub fn step(&mut self, state: &LowState) -> Option<&[JointTarget]> {
        self.tick += 1;
        let t = self.tick;
        let p = &self.params;

        if t < p.bootstrap_ticks {
            for (init, joint) in self.q_init.iter_mut().zip(&p.joints) {
                if let Some(motor) = state.motor_state.get(joint.slot) {
                    *init = motor.q;
                }
            }
        }

        let in_ramp = t >= p.ramp_start && t < p.ramp_end;
        if in_ramp {
            self.ramp_progress += 1;
            let rate = self.ramp_progress as f64 / p.ramp_ticks as f64;
            for ((target, joint), &init) in
                self.targets.iter_mut().zip(&p.joints).zip(&self.q_init)
            {
                target.q =
                    joint_linear_interpolation(init as f64, joint.neutral as f64, rate) as f32;
                target.kp = p.kp;
                target.kd = p.kd;
            }
            self.active = true;
        }

        let oscillating = t >= p.oscillate_start;
        if oscillating {
            let tau = self.osc_count as f64 * p.dt;
            self.osc_count += 1;
            let wave = (2.0 * PI * p.frequency_hz * tau).sin();
            for (target, joint) in self.targets.iter_mut().zip(&p.joints) {
                target.q = (joint.neutral as f64 + joint.amplitude as f64 * wave) as f32;
                target.dq = 0.0;
                target.tau = 0.0;
            }
            self.active = true;
        }

        let phase = if oscillating {
            TrajectoryPhase::Oscillate
        } else if in_ramp {
            TrajectoryPhase::Ramp
        } else if t < p.bootstrap_ticks {
            TrajectoryPhase::Bootstrap
        } else {
            TrajectoryPhase::Hold
        };
        if phase != self.phase {
            info!(tick = t, from = ?self.phase, to = ?phase, "trajectory phase change");
            self.phase = phase;
        }

        if self.active {
            Some(self.targets.as_slice())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state_with_q(q: [f32; 3]) -> LowState {
        let mut s = LowState::default();
        for (i, v) in q.into_iter().enumerate() {
            s.motor_state[i].q = v;
        }
        s
    }

    #[test]
    fn default_params_are_valid() {
        assert!(TrajectoryParams::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_schedules() {
        let mut p = TrajectoryParams::default();
        p.ramp_ticks = 0;
        assert!(p.validate().unwrap_err().contains("ramp_ticks"));

        let mut p = TrajectoryParams::default();
        p.joints[2].slot = 1;
        assert!(p.validate().unwrap_err().contains("duplicate"));

        let mut p = TrajectoryParams::default();
        p.joints[0].slot = NUM_MOTOR;
        assert!(p.validate().unwrap_err().contains("out of range"));

        let mut p = TrajectoryParams::default();
        p.joints.iter_mut().for_each(|j| j.commanded = false);
        assert!(p.validate().unwrap_err().contains("commanded"));

        let mut p = TrajectoryParams::default();
        p.dt = 0.0;
        assert!(p.validate().is_err());

        let mut p = TrajectoryParams::default();
        p.ramp_end = 500;
        assert!(p.validate().unwrap_err().contains("oscillate_start"));
    }

    #[test]
    fn interpolation_endpoints() {
        assert_eq!(joint_linear_interpolation(1.0, 3.0, 0.0), 1.0);
        assert_eq!(joint_linear_interpolation(1.0, 3.0, 1.0), 3.0);
        assert_eq!(joint_linear_interpolation(1.0, 3.0, 0.5), 2.0);
    }

    #[test]
    fn bootstrap_produces_no_targets() {
        let mut generator = TrajectoryGenerator::new(TrajectoryParams::default());
        let state = state_with_q([0.1, 0.2, 0.3]);
        for _ in 1..10 {
            assert!(generator.step(&state).is_none());
            assert_eq!(generator.phase(), TrajectoryPhase::Bootstrap);
        }
        assert_eq!(generator.tick(), 9);
        assert_eq!(generator.initial_positions(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn capture_continues_into_ramp_overlap() {
        let mut generator = TrajectoryGenerator::new(TrajectoryParams::default());
        for _ in 1..10 {
            generator.step(&state_with_q([0.0, 0.0, 0.0]));
        }
        // Tick 10: both windows active; capture happens first.
        let targets = generator.step(&state_with_q([0.0, 0.0, -1.0])).unwrap();
        let expected = joint_linear_interpolation(-1.0, -2.0, 1.0 / 200.0) as f32;
        assert_eq!(targets[2].q, expected);
        assert_eq!(targets[2].kp, 5.0);
        assert_eq!(targets[2].kd, 1.0);
        assert_eq!(generator.phase(), TrajectoryPhase::Ramp);

        // Tick 20 is past bootstrap: the capture is frozen.
        for _ in 11..20 {
            generator.step(&state_with_q([0.0, 0.0, -1.0]));
        }
        generator.step(&state_with_q([0.0, 0.0, 5.0]));
        assert_eq!(generator.initial_positions()[2], -1.0);
    }

    #[test]
    fn ramp_reaches_neutral_and_stays_clamped() {
        let mut generator = TrajectoryGenerator::new(TrajectoryParams::default());
        let state = state_with_q([0.5, 0.5, 0.5]);
        // Progress hits 200 on tick 209.
        for _ in 1..209 {
            generator.step(&state);
        }
        let targets = generator.step(&state).unwrap().to_vec();
        assert_eq!(targets[1].q, 1.2);
        assert_eq!(targets[2].q, -2.0);
        for _ in 210..400 {
            let targets = generator.step(&state).unwrap();
            assert_eq!(targets[2].q, -2.0);
        }
        assert_eq!(generator.tick(), 399);
    }

    #[test]
    fn oscillation_starts_at_neutral() {
        let mut generator = TrajectoryGenerator::new(TrajectoryParams::default());
        let state = LowState::default();
        for _ in 1..400 {
            generator.step(&state);
        }
        // First oscillation sample uses tau = 0.
        let targets = generator.step(&state).unwrap();
        assert_eq!(targets[2].q, -2.0);
        assert_eq!(targets[2].dq, 0.0);
        assert_eq!(targets[2].tau, 0.0);
        assert_eq!(generator.phase(), TrajectoryPhase::Oscillate);

        // Quarter period later (0.25 s / 0.002 s = 125 samples) the wave
        // peaks: neutral + amplitude.
        for _ in 0..124 {
            generator.step(&state);
        }
        let targets = generator.step(&state).unwrap();
        assert!((targets[1].q - 1.8).abs() < 1e-5);
        assert!((targets[2].q - (-2.9)).abs() < 1e-5);
    }

    #[test]
    fn gap_between_windows_holds_last_targets() {
        let params = TrajectoryParams {
            ramp_end: 300,
            ..TrajectoryParams::default()
        };
        let mut generator = TrajectoryGenerator::new(params);
        let state = LowState::default();
        for _ in 1..300 {
            generator.step(&state);
        }
        let before = generator.step(&state).unwrap().to_vec();
        assert_eq!(generator.phase(), TrajectoryPhase::Hold);
        let after = generator.step(&state).unwrap().to_vec();
        assert_eq!(before, after);
    }

    proptest! {
        #[test]
        fn clamped_rate_matches_boundary(
            init in -10.0f64..10.0,
            target in -10.0f64..10.0,
            excess in 0.0f64..1e6,
        ) {
            prop_assert_eq!(
                joint_linear_interpolation(init, target, -excess),
                joint_linear_interpolation(init, target, 0.0)
            );
            prop_assert_eq!(
                joint_linear_interpolation(init, target, 1.0 + excess),
                joint_linear_interpolation(init, target, 1.0)
            );
        }

        #[test]
        fn oscillation_stays_within_amplitude(
            neutral in -3.0f32..3.0,
            amplitude in -1.5f32..1.5,
            frequency_hz in 0.0f64..20.0,
            ticks in 1usize..600,
        ) {
            let params = TrajectoryParams {
                ramp_start: 1,
                ramp_end: 2,
                oscillate_start: 2,
                frequency_hz,
                joints: vec![TrackedJoint { slot: 4, neutral, amplitude, commanded: true }],
                ..TrajectoryParams::default()
            };
            let mut generator = TrajectoryGenerator::new(params);
            let state = LowState::default();
            generator.step(&state);
            for _ in 0..ticks {
                let q = generator.step(&state).unwrap()[0].q;
                prop_assert!(q >= neutral - amplitude.abs() - 1e-5);
                prop_assert!(q <= neutral + amplitude.abs() + 1e-5);
            }
        }
    }
}
