//! Publish/subscribe seam.
//!
//! The control core only needs two operations from its transport: publish a
//! fixed-size frame on a topic and register a callback for frames arriving
//! on a topic. [`LocalBus`] is an in-process implementation used by the
//! simulator, the binaries in `--simulate` mode and the tests; a network
//! transport plugs in behind the same traits.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, trace};

/// Callback invoked on the delivery context with every received frame.
pub type Handler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Transport failure reported by [`Publisher::publish`] or
/// [`Subscriber::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The underlying channel has been shut down.
    #[error("transport closed")]
    Closed,

    /// Lower-level delivery failure.
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Sending half of a topic.
pub trait Publisher: Send {
    /// Hand a frame to the transport. Does not wait for delivery.
    fn publish(&self, frame: &[u8]) -> Result<(), TransportError>;
}

/// Receiving half of a topic.
pub trait Subscriber {
    /// Register `handler` for every frame arriving on this topic.
    fn subscribe(&self, handler: Handler) -> Result<(), TransportError>;
}

// ─── In-process bus ─────────────────────────────────────────────────

#[derive(Default)]
struct BusInner {
    topics: RwLock<HashMap<String, Vec<Handler>>>,
    closed: AtomicBool,
    delivered: AtomicU64,
}

/// In-process topic bus. Cloning yields another handle to the same bus.
///
/// Handlers run synchronously on the publisher's thread, which plays the
/// role of the transport's delivery context.
#[derive(Clone, Default)]
pub struct LocalBus {
    inner: Arc<BusInner>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publisher(&self, topic: &str) -> LocalPublisher {
        LocalPublisher {
            bus: self.clone(),
            topic: topic.to_string(),
        }
    }

    pub fn subscriber(&self, topic: &str) -> LocalSubscriber {
        LocalSubscriber {
            bus: self.clone(),
            topic: topic.to_string(),
        }
    }

    /// Refuse further publishes and subscriptions.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        debug!("local bus closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Number of handler invocations since the bus was created.
    pub fn delivered(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }

    fn publish(&self, topic: &str, frame: &[u8]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        // Copy the handler list so callbacks run without the lock held and
        // may themselves publish or subscribe.
        let handlers = match self.inner.topics.read().get(topic) {
            Some(list) => list.clone(),
            None => return Ok(()),
        };
        trace!(topic, len = frame.len(), receivers = handlers.len(), "publish");
        for handler in &handlers {
            handler(frame);
        }
        self.inner
            .delivered
            .fetch_add(handlers.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn subscribe(&self, topic: &str, handler: Handler) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.inner
            .topics
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(handler);
        debug!(topic, "subscribed");
        Ok(())
    }
}

/// Publisher bound to one topic of a [`LocalBus`].
#[derive(Clone)]
pub struct LocalPublisher {
    bus: LocalBus,
    topic: String,
}

impl LocalPublisher {
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Publisher for LocalPublisher {
    fn publish(&self, frame: &[u8]) -> Result<(), TransportError> {
        self.bus.publish(&self.topic, frame)
    }
}

/// Subscriber bound to one topic of a [`LocalBus`].
#[derive(Clone)]
pub struct LocalSubscriber {
    bus: LocalBus,
    topic: String,
}

impl Subscriber for LocalSubscriber {
    fn subscribe(&self, handler: Handler) -> Result<(), TransportError> {
        self.bus.subscribe(&self.topic, handler)
    }
}
