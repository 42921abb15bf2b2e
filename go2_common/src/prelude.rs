//! Prelude module for common re-exports.
//!
//! ```rust
//! use go2_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{
    CONTROL_CYCLE_US, CONTROL_DT, GAMEPAD_CYCLE_US, NUM_MOTOR, POS_STOP_F, TOPIC_LOWCMD,
    TOPIC_LOWSTATE, TOPIC_WIRELESS_CONTROLLER, VEL_STOP_F,
};

// ─── Integrity ──────────────────────────────────────────────────────
pub use crate::crc::{crc32_core, verify_frame};

// ─── Wire Frames ────────────────────────────────────────────────────
pub use crate::wire::{
    KeySwitch, LOWCMD_SIZE, LOWSTATE_SIZE, LowCmd, LowState, MotorCmd, MotorState,
    WIRELESS_CONTROLLER_SIZE, WireError, WirelessController,
};

// ─── Transport ──────────────────────────────────────────────────────
pub use crate::transport::{Handler, LocalBus, Publisher, Subscriber, TransportError};

/// Nominal control period as a `Duration`.
pub const CONTROL_CYCLE: Duration = Duration::from_micros(CONTROL_CYCLE_US);

/// Nominal gamepad polling period as a `Duration`.
pub const GAMEPAD_CYCLE: Duration = Duration::from_micros(GAMEPAD_CYCLE_US);
