//! # go2 Simulator Library
//!
//! Stand-in for the robot side of the Go2 low-level interface. It accepts
//! `LowCmd` frames, drives twenty PD joints with them and publishes the
//! resulting `LowState` at a fixed rate.
//!
//! # Module Structure
//!
//! - [`physics`] - Per-joint plant and firmware PD law
//! - [`robot`] - Frame validation and state assembly
//! - [`script`] - Scripted gamepad input
//! - [`harness`] - Bus wiring and the simulator thread
//!
//! # Architecture
//!
//! ```text
//!   rt/lowcmd ──► apply_frame ──► SimulatedRobot ──► step ──► rt/lowstate
//!                 (size, CRC)     (20 × JointSim)
//!                                                   WirelessScript ──► rt/wirelesscontroller
//! ```

pub mod harness;
pub mod physics;
pub mod robot;
pub mod script;

pub use crate::harness::{SimConfig, SimHarness};
pub use crate::physics::{JointModel, JointSim};
pub use crate::robot::{SimError, SimStats, SimulatedRobot};
pub use crate::script::WirelessScript;
