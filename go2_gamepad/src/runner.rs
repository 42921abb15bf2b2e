//! Fixed-period gamepad processing.
//!
//! The transport callback only copies the latest raw frame into a shared
//! buffer; the runner's own thread folds it into the [`Gamepad`] once per
//! period.

use go2_common::consts::GAMEPAD_CYCLE_US;
use go2_common::transport::Handler;
use go2_common::wire::WirelessController;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::gamepad::Gamepad;

/// Last-value-wins raw frame buffer shared with the delivery callback.
#[derive(Debug, Default)]
pub struct RawInput {
    frame: Mutex<WirelessController>,
    received: AtomicU64,
    rejected: AtomicU64,
}

impl RawInput {
    pub fn store(&self, frame: WirelessController) {
        *self.frame.lock() = frame;
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn latest(&self) -> WirelessController {
        *self.frame.lock()
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// Owns the filtered gamepad state and the press counter.
pub struct GamepadRunner {
    raw: Arc<RawInput>,
    gamepad: Gamepad,
    press_count: u64,
    steps: u64,
    period: Duration,
}

impl GamepadRunner {
    pub fn new(gamepad: Gamepad) -> Self {
        Self {
            raw: Arc::new(RawInput::default()),
            gamepad,
            press_count: 0,
            steps: 0,
            period: Duration::from_micros(GAMEPAD_CYCLE_US),
        }
    }

    /// Override the processing period (zero is raised to 1 ms).
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period.max(Duration::from_millis(1));
        self
    }

    /// Callback for the wireless controller topic. Short frames are counted
    /// and dropped.
    pub fn handler(&self) -> Handler {
        let raw = Arc::clone(&self.raw);
        Arc::new(move |frame: &[u8]| match WirelessController::decode(frame) {
            Ok(pad) => raw.store(pad),
            Err(e) => {
                let n = raw.rejected.fetch_add(1, Ordering::Relaxed) + 1;
                if n <= 10 || n % 1000 == 0 {
                    warn!(rejected = n, "dropping WirelessController frame: {e}");
                }
            }
        })
    }

    pub fn raw(&self) -> &Arc<RawInput> {
        &self.raw
    }

    pub fn gamepad(&self) -> &Gamepad {
        &self.gamepad
    }

    /// Number of `A` presses seen so far.
    pub fn press_count(&self) -> u64 {
        self.press_count
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Process the latest raw frame once.
    pub fn step(&mut self) -> &Gamepad {
        let frame = self.raw.latest();
        self.gamepad.update(&frame);
        self.steps += 1;

        let a = self.gamepad.a;
        if a.on_press {
            self.press_count += 1;
            info!(press_count = self.press_count, "A pressed");
        }
        debug!(
            lx = self.gamepad.lx,
            a_pressed = a.pressed,
            a_on_press = a.on_press,
            a_on_release = a.on_release,
            press_count = self.press_count,
            "gamepad"
        );
        &self.gamepad
    }

    /// Step at the configured period until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(period_ms = self.period.as_millis() as u64, "entering gamepad loop");
        let mut next_wake = Instant::now();
        while running.load(Ordering::Relaxed) {
            self.step();

            next_wake += self.period;
            let now = Instant::now();
            if next_wake > now {
                thread::sleep(next_wake - now);
            } else {
                next_wake = now;
            }
        }
        info!(
            steps = self.steps,
            press_count = self.press_count,
            "gamepad loop stopped"
        );
    }

    /// Move the runner onto a named thread; the handle returns it when
    /// `running` is cleared.
    pub fn spawn(mut self, running: Arc<AtomicBool>) -> std::io::Result<JoinHandle<Self>> {
        thread::Builder::new()
            .name("go2-gamepad".to_string())
            .spawn(move || {
                self.run(&running);
                self
            })
    }
}

impl Default for GamepadRunner {
    fn default() -> Self {
        Self::new(Gamepad::default())
    }
}
