//! Mock CAN bus for testing
//!
//! Records every frame handed to [`CanBus::send_frame`] so tests can assert on
//! egress without hardware. Clones share the same buffer.

use crate::bus::{CanBus, CanFrame};
use crate::error::GatewayError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
pub struct MockBus {
    /// Frames sent so far (outgoing)
    sent: Arc<Mutex<Vec<CanFrame>>>,
    /// Simulated transmit failure
    failing: Arc<AtomicBool>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn frames(&self) -> MutexGuard<'_, Vec<CanFrame>> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of every frame sent so far.
    pub fn sent_frames(&self) -> Vec<CanFrame> {
        self.frames().clone()
    }

    /// Drain the sent frames.
    pub fn take_sent(&self) -> Vec<CanFrame> {
        std::mem::take(&mut *self.frames())
    }

    pub fn sent_count(&self) -> usize {
        self.frames().len()
    }

    /// Make subsequent sends fail with a bus error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

impl CanBus for MockBus {
    fn send_frame(&mut self, frame: &CanFrame) -> Result<(), GatewayError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(GatewayError::Bus("mock transmit failure".into()));
        }
        self.frames().push(*frame);
        Ok(())
    }
}
