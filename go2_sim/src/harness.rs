//! Bus-attached simulator thread.
//!
//! [`SimHarness::attach`] subscribes the robot to the command topic and
//! starts a thread that steps the plant every period and publishes the
//! resulting `LowState` (and, optionally, scripted gamepad frames).

use go2_common::consts::{CONTROL_CYCLE_US, GAMEPAD_CYCLE_US, NUM_MOTOR};
use go2_common::consts::{TOPIC_LOWCMD, TOPIC_LOWSTATE, TOPIC_WIRELESS_CONTROLLER};
use go2_common::transport::{LocalBus, LocalPublisher, Publisher, Subscriber};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::physics::JointModel;
use crate::robot::{SimError, SimStats, SimulatedRobot, lying_pose};
use crate::script::WirelessScript;

/// Simulator wiring and plant parameters.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Integration and `LowState` publish period.
    pub period: Duration,
    pub lowcmd_topic: String,
    pub lowstate_topic: String,
    pub wireless_topic: String,
    pub model: JointModel,
    /// Joint positions at startup [rad].
    pub initial_q: [f32; NUM_MOTOR],
    /// Scripted gamepad input; `None` publishes nothing on the wireless topic.
    pub wireless: Option<WirelessScript>,
    pub wireless_period: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_micros(CONTROL_CYCLE_US),
            lowcmd_topic: TOPIC_LOWCMD.to_string(),
            lowstate_topic: TOPIC_LOWSTATE.to_string(),
            wireless_topic: TOPIC_WIRELESS_CONTROLLER.to_string(),
            model: JointModel::default(),
            initial_q: lying_pose(),
            wireless: None,
            wireless_period: Duration::from_micros(GAMEPAD_CYCLE_US),
        }
    }
}

/// Running simulator. Stops its thread on [`SimHarness::stop`] or drop.
pub struct SimHarness {
    robot: Arc<Mutex<SimulatedRobot>>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SimHarness {
    /// Subscribe to `config.lowcmd_topic` and start the simulator thread.
    ///
    /// # Errors
    /// `SimError::Transport` if the subscription is refused,
    /// `SimError::Spawn` if the thread cannot be created.
    pub fn attach(bus: &LocalBus, config: SimConfig) -> Result<Self, SimError> {
        let robot = Arc::new(Mutex::new(SimulatedRobot::new(
            config.model,
            &config.initial_q,
        )));

        let sink = Arc::clone(&robot);
        bus.subscriber(&config.lowcmd_topic)
            .subscribe(Arc::new(move |frame: &[u8]| {
                let mut robot = sink.lock();
                if let Err(e) = robot.apply_frame(frame) {
                    let n = robot.stats().rejected();
                    if n <= 10 || n % 1000 == 0 {
                        warn!("Rejected LowCmd #{n}: {e}");
                    }
                }
            }))?;

        let running = Arc::new(AtomicBool::new(true));
        let worker = SimWorker {
            robot: Arc::clone(&robot),
            running: Arc::clone(&running),
            lowstate: bus.publisher(&config.lowstate_topic),
            wireless: config
                .wireless
                .map(|script| (script, bus.publisher(&config.wireless_topic))),
            period: config.period,
            wireless_period: config.wireless_period,
        };

        let thread = std::thread::Builder::new()
            .name("go2-sim".into())
            .spawn(move || worker.run())?;

        info!(
            period_us = config.period.as_micros() as u64,
            lowcmd = %config.lowcmd_topic,
            lowstate = %config.lowstate_topic,
            "Simulator attached"
        );

        Ok(Self {
            robot,
            running,
            thread: Some(thread),
        })
    }

    /// Snapshot of the simulated robot.
    pub fn robot(&self) -> SimulatedRobot {
        self.robot.lock().clone()
    }

    pub fn stats(&self) -> SimStats {
        self.robot.lock().stats()
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the thread and return the final counters.
    pub fn stop(mut self) -> SimStats {
        self.shutdown();
        self.stats()
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("Simulator thread panicked");
        }
    }
}

impl Drop for SimHarness {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct SimWorker {
    robot: Arc<Mutex<SimulatedRobot>>,
    running: Arc<AtomicBool>,
    lowstate: LocalPublisher,
    wireless: Option<(WirelessScript, LocalPublisher)>,
    period: Duration,
    wireless_period: Duration,
}

impl SimWorker {
    fn run(self) {
        let start = Instant::now();
        let mut next_wake = start;
        let mut next_wireless = start;

        while self.running.load(Ordering::SeqCst) {
            let mut state = {
                let mut robot = self.robot.lock();
                robot.step(self.period);
                robot.state()
            };
            // Publish outside the lock: subscribers may run arbitrary code.
            let frame = state.encode_with_crc();
            if let Err(e) = self.lowstate.publish(&frame) {
                debug!("LowState publish failed: {e}");
                break;
            }

            let now = Instant::now();
            if let Some((script, publisher)) = &self.wireless
                && now >= next_wireless
            {
                let frame = script.frame_at(now - start).encode();
                if let Err(e) = publisher.publish(&frame) {
                    debug!("WirelessController publish failed: {e}");
                }
                next_wireless += self.wireless_period;
            }

            next_wake += self.period;
            let now = Instant::now();
            if next_wake > now {
                std::thread::sleep(next_wake - now);
            } else {
                next_wake = now;
            }
        }
        debug!("Simulator thread exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use go2_common::wire::{LowCmd, LowState, WirelessController};
    use std::sync::atomic::AtomicU64;

    fn wait_for(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn publishes_crc_valid_lowstate() {
        let bus = LocalBus::new();
        let last = Arc::new(Mutex::new(None::<LowState>));
        let sink = Arc::clone(&last);
        bus.subscriber(TOPIC_LOWSTATE)
            .subscribe(Arc::new(move |frame: &[u8]| {
                assert!(go2_common::crc::verify_frame(frame));
                *sink.lock() = LowState::decode(frame).ok();
            }))
            .unwrap();

        let sim = SimHarness::attach(&bus, SimConfig::default()).unwrap();
        assert!(wait_for(|| last.lock().is_some()));
        let state = last.lock().unwrap();
        assert_eq!(state.motor_state[1].q, 1.36);
        assert!(sim.stats().steps > 0);
        sim.stop();
    }

    #[test]
    fn applies_commands_from_bus() {
        let bus = LocalBus::new();
        let sim = SimHarness::attach(&bus, SimConfig::default()).unwrap();

        let mut cmd = LowCmd::new();
        cmd.motor_cmd[0].q = 0.5;
        cmd.motor_cmd[0].dq = 0.0;
        cmd.motor_cmd[0].kp = 5.0;
        cmd.motor_cmd[0].kd = 1.0;
        let frame = cmd.encode_with_crc();
        bus.publisher(TOPIC_LOWCMD).publish(&frame).unwrap();
        bus.publisher(TOPIC_LOWCMD).publish(&frame[..64]).unwrap();

        assert!(wait_for(|| sim.robot().joint(0).is_some_and(|j| j.q > 0.1)));
        let stats = sim.stop();
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected_size, 1);
    }

    #[test]
    fn scripted_wireless_frames_are_published() {
        let bus = LocalBus::new();
        let frames = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&frames);
        bus.subscriber(TOPIC_WIRELESS_CONTROLLER)
            .subscribe(Arc::new(move |frame: &[u8]| {
                assert!(WirelessController::decode(frame).is_ok());
                counter.fetch_add(1, Ordering::Relaxed);
            }))
            .unwrap();

        let sim = SimHarness::attach(
            &bus,
            SimConfig {
                wireless: Some(WirelessScript::default()),
                wireless_period: Duration::from_millis(5),
                ..SimConfig::default()
            },
        )
        .unwrap();
        assert!(wait_for(|| frames.load(Ordering::Relaxed) >= 3));
        drop(sim);
    }

    #[test]
    fn stops_when_bus_closes() {
        let bus = LocalBus::new();
        let sim = SimHarness::attach(&bus, SimConfig::default()).unwrap();
        bus.close();
        assert!(wait_for(|| !sim.is_running()));
    }
}
