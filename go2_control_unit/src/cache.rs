//! Last-value-wins sensor snapshot cache.
//!
//! Written by the transport's delivery callback, read once per control tick.
//! The lock is held only for a value copy; a snapshot overwritten before the
//! control loop reads it is simply never seen.

use go2_common::transport::Handler;
use go2_common::wire::LowState;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Single shared snapshot guarded by a mutex.
#[derive(Debug, Default)]
pub struct SnapshotCache<T> {
    value: Mutex<T>,
    updates: AtomicU64,
    rejected: AtomicU64,
}

impl<T: Clone> SnapshotCache<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: Mutex::new(initial),
            updates: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Replace the stored snapshot.
    pub fn update(&self, snapshot: T) {
        *self.value.lock() = snapshot;
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of the current snapshot.
    pub fn read(&self) -> T {
        self.value.lock().clone()
    }

    /// Number of accepted updates since creation.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Number of received frames that could not be decoded.
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl SnapshotCache<LowState> {
    /// Subscriber callback decoding `LowState` frames into this cache.
    ///
    /// Undecodable frames are dropped; the first one and every 1000th after
    /// it are logged.
    pub fn handler(self: &Arc<Self>) -> Handler {
        let cache = Arc::clone(self);
        Arc::new(move |frame: &[u8]| match LowState::decode(frame) {
            Ok(state) => cache.update(state),
            Err(e) => {
                let n = cache.rejected.fetch_add(1, Ordering::Relaxed);
                if n % 1000 == 0 {
                    warn!(rejected = n + 1, "dropping LowState frame: {e}");
                }
            }
        })
    }
}
