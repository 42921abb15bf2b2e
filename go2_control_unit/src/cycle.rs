//! Periodic control cycle: read snapshot → trajectory → CRC → publish.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`: lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity`: pin to the requested CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`.
//!
//! All four steps are no-ops unless the `rt` feature is enabled.
//!
//! ## Cycle Loop
//! With `rt`, ticks are paced by `clock_nanosleep(TIMER_ABSTIME)` on
//! `CLOCK_MONOTONIC`; otherwise the loop sleeps the remainder of the period.
//! Overruns are counted and logged but never enforced: a late tick is
//! followed immediately by the next one, with no catch-up burst.
//!
//! ## Cycle Body
//! Copy the latest `LowState`, advance the trajectory, overwrite the
//! commanded slots of the persistent `LowCmd`, stamp the CRC and hand the
//! frame to the publisher without waiting for delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use go2_common::transport::{Publisher, TransportError};
use go2_common::wire::{LowCmd, LowState};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::SnapshotCache;
use crate::trajectory::{TrajectoryGenerator, TrajectoryParams};

/// Cycles between periodic statistics reports.
const STATS_REPORT_INTERVAL: u64 = 5000;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// Timing and delivery counters of the control thread. Updating is O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub cycle_count: u64,
    /// Cycles whose body took longer than the period.
    pub overruns: u64,
    /// Frames the publisher refused.
    pub publish_failures: u64,
    /// Body duration of the most recent cycle [ns].
    pub body_last_ns: u64,
    pub body_min_ns: u64,
    pub body_max_ns: u64,
    pub body_total_ns: u64,
    /// Worst wake-up lateness against the schedule [ns].
    pub wake_late_max_ns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            overruns: 0,
            publish_failures: 0,
            body_last_ns: 0,
            body_min_ns: u64::MAX,
            body_max_ns: 0,
            body_total_ns: 0,
            wake_late_max_ns: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, body_ns: u64, wake_late_ns: u64) {
        self.cycle_count += 1;
        self.body_last_ns = body_ns;
        self.body_min_ns = self.body_min_ns.min(body_ns);
        self.body_max_ns = self.body_max_ns.max(body_ns);
        self.body_total_ns = self.body_total_ns.saturating_add(body_ns);
        self.wake_late_max_ns = self.wake_late_max_ns.max(wake_late_ns);
    }

    /// Mean body duration [ns], 0 before the first cycle.
    #[inline]
    pub fn avg_body_ns(&self) -> u64 {
        self.body_total_ns.checked_div(self.cycle_count).unwrap_or(0)
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Failures of the control thread.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Memory locking, CPU pinning or scheduler change was refused.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// Monotonic clock could not be read.
    #[error("clock error: {0}")]
    Clock(String),

    /// Trajectory parameters rejected at construction.
    #[error("invalid trajectory: {0}")]
    Trajectory(String),

    /// The transport refused a frame. Counted, never fatal inside `run`.
    #[error("publish failed: {0}")]
    Publish(#[from] TransportError),
}

// ─── RT Placement ───────────────────────────────────────────────────

/// CPU core and SCHED_FIFO priority for the control thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtPlacement {
    pub cpu_core: usize,
    pub priority: i32,
}

impl RtPlacement {
    /// Lock memory, prefault the stack, pin and promote the calling thread.
    /// Does nothing unless the `rt` feature is enabled.
    ///
    /// # Errors
    /// `CycleError::RtSetup` naming the refused step.
    pub fn apply(&self) -> Result<(), CycleError> {
        #[cfg(feature = "rt")]
        {
            rt::lock_memory()?;
            rt::prefault_stack();
            rt::pin_to_core(self.cpu_core)?;
            rt::set_fifo(self.priority)?;
        }
        Ok(())
    }
}

#[cfg(feature = "rt")]
mod rt {
    use super::CycleError;

    const STACK_PREFAULT_BYTES: usize = 256 * 1024;

    pub(super) fn lock_memory() -> Result<(), CycleError> {
        use nix::sys::mman::{MlockallFlags, mlockall};
        mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
            .map_err(|e| CycleError::RtSetup(format!("mlockall: {e}")))
    }

    pub(super) fn prefault_stack() {
        let mut page = [0u8; STACK_PREFAULT_BYTES];
        for b in page.iter_mut() {
            // SAFETY: `b` is an exclusive reference into a live local array.
            unsafe { std::ptr::write_volatile(b, 1) };
        }
        std::hint::black_box(&page);
    }

    pub(super) fn pin_to_core(cpu: usize) -> Result<(), CycleError> {
        use nix::sched::{CpuSet, sched_setaffinity};
        use nix::unistd::Pid;

        let mut set = CpuSet::new();
        set.set(cpu)
            .map_err(|e| CycleError::RtSetup(format!("cpu {cpu} not addressable: {e}")))?;
        sched_setaffinity(Pid::from_raw(0), &set)
            .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity(cpu {cpu}): {e}")))
    }

    pub(super) fn set_fifo(priority: i32) -> Result<(), CycleError> {
        let param = libc::sched_param {
            sched_priority: priority,
        };
        // SAFETY: pid 0 is the calling thread and `param` lives across the call.
        if unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) } == 0 {
            Ok(())
        } else {
            Err(CycleError::RtSetup(format!(
                "SCHED_FIFO priority {priority}: {}",
                std::io::Error::last_os_error()
            )))
        }
    }
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the trajectory, the persistent command frame and the publisher.
pub struct CycleRunner<P> {
    cache: Arc<SnapshotCache<LowState>>,
    trajectory: TrajectoryGenerator,
    cmd: LowCmd,
    publisher: P,
    stats: CycleStats,
    cycle_time: Duration,
    budget_ns: u64,
}

impl<P: Publisher> CycleRunner<P> {
    /// Build a runner reading from `cache` and publishing to `publisher`.
    ///
    /// The command frame starts with every slot holding the stop sentinels;
    /// only commanded joints are ever overwritten.
    pub fn new(
        params: TrajectoryParams,
        cycle_time: Duration,
        cache: Arc<SnapshotCache<LowState>>,
        publisher: P,
    ) -> Result<Self, CycleError> {
        params.validate().map_err(CycleError::Trajectory)?;
        Ok(Self {
            cache,
            trajectory: TrajectoryGenerator::new(params),
            cmd: LowCmd::new(),
            publisher,
            stats: CycleStats::new(),
            cycle_time,
            budget_ns: cycle_time.as_nanos() as u64,
        })
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Last command frame (CRC refreshed on every tick).
    pub fn command(&self) -> &LowCmd {
        &self.cmd
    }

    pub fn trajectory(&self) -> &TrajectoryGenerator {
        &self.trajectory
    }

    pub fn cycle_time(&self) -> Duration {
        self.cycle_time
    }

    /// One cycle body.
    ///
    /// # Errors
    /// `CycleError::Publish` when the transport refuses the frame; the
    /// frame is dropped and the failure counted.
    pub fn tick(&mut self) -> Result<(), CycleError> {
        let state = self.cache.read();
        if let Some(targets) = self.trajectory.step(&state) {
            for target in targets.iter().filter(|t| t.commanded) {
                if let Some(motor) = self.cmd.motor_cmd.get_mut(target.slot) {
                    motor.q = target.q;
                    motor.dq = target.dq;
                    motor.kp = target.kp;
                    motor.kd = target.kd;
                    motor.tau = target.tau;
                }
            }
        }

        let frame = self.cmd.encode_with_crc();
        self.publisher.publish(&frame).map_err(|e| {
            self.stats.publish_failures += 1;
            CycleError::Publish(e)
        })
    }

    /// Run cycles until `running` is cleared.
    ///
    /// Publish failures and overruns are logged and counted; only clock
    /// failures end the loop early.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        info!(
            cycle_time_us = self.cycle_time.as_micros() as u64,
            joints = self.trajectory.params().joints.len(),
            "entering control loop"
        );

        #[cfg(feature = "rt")]
        let result = self.run_rt_loop(running);

        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop(running);

        info!(
            cycles = self.stats.cycle_count,
            overruns = self.stats.overruns,
            publish_failures = self.stats.publish_failures,
            avg_body_ns = self.stats.avg_body_ns(),
            max_body_ns = self.stats.body_max_ns,
            "control loop stopped"
        );
        result
    }

    /// Statistics, overrun warning and periodic report after one body.
    fn finish_cycle(&mut self, body_ns: u64, wake_late_ns: u64) {
        self.stats.record(body_ns, wake_late_ns);

        if body_ns > self.budget_ns {
            self.stats.overruns += 1;
            let n = self.stats.overruns;
            if n <= 10 || n % 1000 == 0 {
                warn!(
                    overruns = n,
                    body_us = body_ns / 1000,
                    budget_us = self.budget_ns / 1000,
                    "control cycle overrun"
                );
            }
        }

        if self.stats.cycle_count % STATS_REPORT_INTERVAL == 0 {
            debug!(
                cycles = self.stats.cycle_count,
                avg_body_ns = self.stats.avg_body_ns(),
                max_body_ns = self.stats.body_max_ns,
                wake_late_max_ns = self.stats.wake_late_max_ns,
                phase = ?self.trajectory.phase(),
                "cycle stats"
            );
        }
    }

    fn tick_logged(&mut self) {
        if let Err(e) = self.tick() {
            let n = self.stats.publish_failures;
            if n <= 10 || n % 1000 == 0 {
                warn!(failures = n, "dropping LowCmd frame: {e}");
            }
        }
    }

    /// Absolute-deadline pacing with `clock_nanosleep(TIMER_ABSTIME)`.
    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        use nix::sys::time::{TimeSpec, TimeValLike};
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || clock_gettime(clock).map_err(|e| CycleError::Clock(e.to_string()));
        let ns = |span: TimeSpec| span.num_nanoseconds().max(0) as u64;
        let period = TimeSpec::nanoseconds(self.budget_ns as i64);
        let mut deadline = now()?;

        while running.load(Ordering::Relaxed) {
            let start = now()?;
            self.tick_logged();
            let end = now()?;
            self.finish_cycle(ns(end - start), ns(start - deadline));

            deadline = deadline + period;
            if end > deadline {
                // Late: the next tick starts now, no catch-up.
                deadline = end;
            }
            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &deadline);
        }
        Ok(())
    }

    /// Relative pacing with `thread::sleep` for development hosts.
    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        use std::time::Instant;

        while running.load(Ordering::Relaxed) {
            let start = Instant::now();
            self.tick_logged();
            let body = start.elapsed();
            self.finish_cycle(body.as_nanos() as u64, 0);

            if let Some(rest) = self.cycle_time.checked_sub(body) {
                thread::sleep(rest);
            }
        }
        Ok(())
    }
}

impl<P: Publisher + 'static> CycleRunner<P> {
    /// Move the runner onto the `go2-lowcmd` thread.
    ///
    /// `rt` placement is applied on that thread before the first tick. The
    /// handle yields the final statistics once `running` is cleared.
    pub fn spawn(
        mut self,
        running: Arc<AtomicBool>,
        rt: Option<RtPlacement>,
    ) -> std::io::Result<JoinHandle<Result<CycleStats, CycleError>>> {
        thread::Builder::new()
            .name("go2-lowcmd".to_string())
            .spawn(move || -> Result<CycleStats, CycleError> {
                if let Some(placement) = rt {
                    placement.apply()?;
                    info!(
                        cpu_core = placement.cpu_core,
                        priority = placement.priority,
                        "RT placement applied"
                    );
                }
                self.run(&running)?;
                Ok(self.stats)
            })
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
