//! # go2 Gamepad Library
//!
//! Turns raw `WirelessController` frames into smoothed stick axes and
//! edge-triggered button events.
//!
//! - [`gamepad`] - Axis filter, button decode and edge detection
//! - [`runner`] - Raw frame buffer and the fixed-period processing loop

pub mod gamepad;
pub mod runner;

pub use crate::gamepad::{Button, Gamepad, KeySwitch};
pub use crate::runner::{GamepadRunner, RawInput};
