//! Scripted gamepad input for exercising the wireless controller path.

use go2_common::wire::{KeySwitch, WirelessController};
use std::f64::consts::TAU;
use std::time::Duration;

/// Sine sweep on the left stick X axis plus a periodic A button press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WirelessScript {
    /// Peak stick deflection, clamped to [0, 1] when sampled.
    pub amplitude: f32,
    /// Sweep period.
    pub stick_period: Duration,
    /// Interval between the starts of two A presses.
    pub press_interval: Duration,
    /// How long A stays down per press.
    pub press_length: Duration,
}

impl Default for WirelessScript {
    fn default() -> Self {
        Self {
            amplitude: 0.8,
            stick_period: Duration::from_secs(4),
            press_interval: Duration::from_secs(2),
            press_length: Duration::from_millis(200),
        }
    }
}

impl WirelessScript {
    /// Controller frame at time `t` since the script started.
    pub fn frame_at(&self, t: Duration) -> WirelessController {
        let amplitude = self.amplitude.clamp(0.0, 1.0) as f64;
        let lx = if self.stick_period.is_zero() {
            0.0
        } else {
            amplitude * (TAU * t.as_secs_f64() / self.stick_period.as_secs_f64()).sin()
        };

        let mut keys = KeySwitch::empty();
        if !self.press_interval.is_zero() {
            let phase = t.as_nanos() % self.press_interval.as_nanos();
            if phase < self.press_length.as_nanos() {
                keys |= KeySwitch::A;
            }
        }

        WirelessController {
            lx: lx as f32,
            keys: keys.bits(),
            ..Default::default()
        }
    }
}
