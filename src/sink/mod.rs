//! # Telemetry Sink
//!
//! The gateway publishes through the narrow [`Sink`] trait:
//! `publish(topic, payload, retained)`. [`SinkAdapter`] builds Home Assistant
//! discovery and state messages on top of it; [`mqtt::MqttSink`] ships them to
//! a broker and [`RecordingSink`] keeps them for tests.
//!
//! Publish failures never reach the control loop. The adapter logs them
//! (rate-limited) and the next periodic publication restores state.

pub mod adapter;
pub mod discovery;
pub mod mqtt;

pub use adapter::SinkAdapter;
pub use discovery::Naming;

use crate::error::GatewayError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Downstream pub/sub transport.
pub trait Sink {
    /// Hand one message to the transport without waiting for delivery.
    fn publish(&mut self, topic: &str, payload: &str, retained: bool) -> Result<(), GatewayError>;
}

impl<T: Sink + ?Sized> Sink for Box<T> {
    fn publish(&mut self, topic: &str, payload: &str, retained: bool) -> Result<(), GatewayError> {
        (**self).publish(topic, payload, retained)
    }
}

/// A message as handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retained: bool,
}

/// Sink that stores every message. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    published: Arc<Mutex<Vec<Published>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn messages(&self) -> MutexGuard<'_, Vec<Published>> {
        self.published.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn published(&self) -> Vec<Published> {
        self.messages().clone()
    }

    /// Drain the recorded messages.
    pub fn take(&self) -> Vec<Published> {
        std::mem::take(&mut *self.messages())
    }

    /// Messages published on one topic, oldest first.
    pub fn on_topic(&self, topic: &str) -> Vec<Published> {
        self.messages()
            .iter()
            .filter(|p| p.topic == topic)
            .cloned()
            .collect()
    }

    /// Make subsequent publishes fail; failed messages are not recorded.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

impl Sink for RecordingSink {
    fn publish(&mut self, topic: &str, payload: &str, retained: bool) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(GatewayError::Sink("recording sink set to fail".into()));
        }
        self.messages().push(Published {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retained,
        });
        Ok(())
    }
}
