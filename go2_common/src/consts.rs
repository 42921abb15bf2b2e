//! System-wide constants for the go2 workspace.
//!
//! Single source of truth for motor counts, protocol sentinels, topic names
//! and default loop periods. Imported by all crates.

/// Motor command/state slots carried by every `LowCmd` / `LowState` frame.
pub const NUM_MOTOR: usize = 20;

/// Slots backed by a physical joint on the Go2 (the rest are reserved).
pub const PHYSICAL_MOTORS: usize = 12;

/// Position target that disables position tracking in the motor firmware.
pub const POS_STOP_F: f32 = 2.146e9;

/// Velocity target that disables velocity tracking in the motor firmware.
pub const VEL_STOP_F: f32 = 16000.0;

/// Motor mode byte: servo (PMSM) mode.
pub const SERVO_MODE: u8 = 0x01;

/// Fixed `LowCmd` frame header.
pub const LOWCMD_HEAD: [u8; 2] = [0xFE, 0xEF];

/// `LowCmd` level flag for low-level control.
pub const LOWCMD_LEVEL_FLAG: u8 = 0xFF;

/// Command topic (control unit → robot).
pub const TOPIC_LOWCMD: &str = "rt/lowcmd";

/// Sensor topic (robot → control unit).
pub const TOPIC_LOWSTATE: &str = "rt/lowstate";

/// Wireless controller topic (robot → gamepad processor).
pub const TOPIC_WIRELESS_CONTROLLER: &str = "rt/wirelesscontroller";

/// Default control cycle in microseconds (500 Hz).
pub const CONTROL_CYCLE_US: u64 = 2000;

/// Nominal control timestep in seconds, matching [`CONTROL_CYCLE_US`].
pub const CONTROL_DT: f64 = 0.002;

/// Default gamepad processing cycle in microseconds (25 Hz).
pub const GAMEPAD_CYCLE_US: u64 = 40_000;
