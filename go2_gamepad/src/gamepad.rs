//! Stick smoothing and button edge detection.
//!
//! Each axis runs a first-order low-pass filter over its deadzoned raw
//! value:
//!
//! ```text
//! v = v * (1 - smooth) + (|raw| < dead_zone ? 0 : raw) * smooth
//! ```
//!
//! Sub-deadzone noise decays toward zero while a persistent deflection
//! above the deadzone converges to its true value. Buttons are decoded from
//! the [`KeySwitch`] bitfield and report one-tick press/release pulses; there
//! is no debounce, so toggles faster than the polling period may be missed.

use go2_common::wire::WirelessController;

pub use go2_common::wire::KeySwitch;

/// Default smoothing factor.
pub const DEFAULT_SMOOTH: f32 = 0.03;
/// Default deadzone threshold.
pub const DEFAULT_DEAD_ZONE: f32 = 0.01;

/// Level and edge state of one button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Button {
    pub pressed: bool,
    /// True only on the tick the button went down.
    pub on_press: bool,
    /// True only on the tick the button came up.
    pub on_release: bool,
}

impl Button {
    pub fn update(&mut self, state: bool) {
        let changed = state != self.pressed;
        self.on_press = state && changed;
        self.on_release = !state && changed;
        self.pressed = state;
    }
}

/// Filtered controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct Gamepad {
    smooth: f32,
    dead_zone: f32,

    pub lx: f32,
    pub ly: f32,
    pub rx: f32,
    pub ry: f32,

    pub r1: Button,
    pub l1: Button,
    pub start: Button,
    pub select: Button,
    pub r2: Button,
    pub l2: Button,
    pub f1: Button,
    pub f2: Button,
    pub a: Button,
    pub b: Button,
    pub x: Button,
    pub y: Button,
    pub up: Button,
    pub right: Button,
    pub down: Button,
    pub left: Button,
}

impl Default for Gamepad {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTH, DEFAULT_DEAD_ZONE)
    }
}

impl Gamepad {
    /// Centered sticks, all buttons up. Out-of-range parameters are
    /// clamped as by the setters.
    pub fn new(smooth: f32, dead_zone: f32) -> Self {
        let mut pad = Self {
            smooth: DEFAULT_SMOOTH,
            dead_zone: DEFAULT_DEAD_ZONE,
            lx: 0.0,
            ly: 0.0,
            rx: 0.0,
            ry: 0.0,
            r1: Button::default(),
            l1: Button::default(),
            start: Button::default(),
            select: Button::default(),
            r2: Button::default(),
            l2: Button::default(),
            f1: Button::default(),
            f2: Button::default(),
            a: Button::default(),
            b: Button::default(),
            x: Button::default(),
            y: Button::default(),
            up: Button::default(),
            right: Button::default(),
            down: Button::default(),
            left: Button::default(),
        };
        pad.set_smooth(smooth);
        pad.set_dead_zone(dead_zone);
        pad
    }

    pub fn smooth(&self) -> f32 {
        self.smooth
    }

    pub fn dead_zone(&self) -> f32 {
        self.dead_zone
    }

    /// Set the smoothing factor, clamped to [0, 1]. NaN keeps the current
    /// value.
    pub fn set_smooth(&mut self, smooth: f32) {
        if !smooth.is_nan() {
            self.smooth = smooth.clamp(0.0, 1.0);
        }
    }

    /// Set the deadzone threshold, clamped to be non-negative. NaN keeps the
    /// current value.
    pub fn set_dead_zone(&mut self, dead_zone: f32) {
        if !dead_zone.is_nan() {
            self.dead_zone = dead_zone.max(0.0);
        }
    }

    /// Fold one raw frame into the filtered state.
    pub fn update(&mut self, raw: &WirelessController) {
        let (smooth, dead_zone) = (self.smooth, self.dead_zone);
        for (v, r) in [
            (&mut self.lx, raw.lx),
            (&mut self.rx, raw.rx),
            (&mut self.ry, raw.ry),
            (&mut self.ly, raw.ly),
        ] {
            *v = filter_axis(*v, r, smooth, dead_zone);
        }

        let keys = raw.key_switch();
        for (flag, button) in self.buttons_mut() {
            button.update(keys.contains(flag));
        }
    }

    /// Button state by flag. `None` unless `flag` names exactly one button.
    pub fn button(&self, flag: KeySwitch) -> Option<&Button> {
        self.buttons()
            .into_iter()
            .find_map(|(f, b)| (f == flag).then_some(b))
    }

    /// Every button with its flag, in bit order.
    pub fn buttons(&self) -> [(KeySwitch, &Button); 16] {
        [
            (KeySwitch::R1, &self.r1),
            (KeySwitch::L1, &self.l1),
            (KeySwitch::START, &self.start),
            (KeySwitch::SELECT, &self.select),
            (KeySwitch::R2, &self.r2),
            (KeySwitch::L2, &self.l2),
            (KeySwitch::F1, &self.f1),
            (KeySwitch::F2, &self.f2),
            (KeySwitch::A, &self.a),
            (KeySwitch::B, &self.b),
            (KeySwitch::X, &self.x),
            (KeySwitch::Y, &self.y),
            (KeySwitch::UP, &self.up),
            (KeySwitch::RIGHT, &self.right),
            (KeySwitch::DOWN, &self.down),
            (KeySwitch::LEFT, &self.left),
        ]
    }

    fn buttons_mut(&mut self) -> [(KeySwitch, &mut Button); 16] {
        [
            (KeySwitch::R1, &mut self.r1),
            (KeySwitch::L1, &mut self.l1),
            (KeySwitch::START, &mut self.start),
            (KeySwitch::SELECT, &mut self.select),
            (KeySwitch::R2, &mut self.r2),
            (KeySwitch::L2, &mut self.l2),
            (KeySwitch::F1, &mut self.f1),
            (KeySwitch::F2, &mut self.f2),
            (KeySwitch::A, &mut self.a),
            (KeySwitch::B, &mut self.b),
            (KeySwitch::X, &mut self.x),
            (KeySwitch::Y, &mut self.y),
            (KeySwitch::UP, &mut self.up),
            (KeySwitch::RIGHT, &mut self.right),
            (KeySwitch::DOWN, &mut self.down),
            (KeySwitch::LEFT, &mut self.left),
        ]
    }
}

/// One low-pass step. Raw input is clamped to [-1, 1]; non-finite input
/// reads as centered. The output clamp only absorbs rounding.
fn filter_axis(current: f32, raw: f32, smooth: f32, dead_zone: f32) -> f32 {
    let raw = if raw.is_finite() {
        raw.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let input = if raw.abs() < dead_zone { 0.0 } else { raw };
    (current * (1.0 - smooth) + input * smooth).clamp(-1.0, 1.0)
}
