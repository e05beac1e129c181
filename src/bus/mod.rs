//! # CAN Bus Boundary
//!
//! The gateway core talks to the bus through two narrow seams:
//!
//! - [`CanBus::send_frame`] for egress. Implementations must return immediately;
//!   transports with their own I/O task queue the frame and drop it when full.
//! - [`FrameRing`] for ingress. The transport's reader is the single producer,
//!   the control loop the single consumer. When the ring is full the oldest
//!   frame is overwritten; the poll loop recovers lost replies on its next pass.

pub mod mock;
pub mod slcan;
#[cfg(all(target_os = "linux", feature = "socketcan"))]
pub mod socketcan;

use crate::constants::CAN_STANDARD_ID_MAX;
use crate::error::GatewayError;
use async_trait::async_trait;
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use mock::MockBus;

/// A standard (11-bit) CAN data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    pub id: u16,
    len: u8,
    data: [u8; 8],
}

impl CanFrame {
    pub fn new(id: u16, payload: &[u8]) -> Result<Self, GatewayError> {
        if id > CAN_STANDARD_ID_MAX {
            return Err(GatewayError::Bus(format!("identifier 0x{id:X} exceeds 11 bits")));
        }
        if payload.len() > 8 {
            return Err(GatewayError::Bus(format!("{} data bytes exceed 8", payload.len())));
        }
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Ok(CanFrame {
            id,
            len: payload.len() as u8,
            data,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data[..usize::from(self.len)]
    }
}

/// Outbound side of a CAN transport.
pub trait CanBus {
    /// Queue one frame for transmission without blocking.
    fn send_frame(&mut self, frame: &CanFrame) -> Result<(), GatewayError>;
}

impl<T: CanBus + ?Sized> CanBus for Box<T> {
    fn send_frame(&mut self, frame: &CanFrame) -> Result<(), GatewayError> {
        (**self).send_frame(frame)
    }
}

/// Inbound side of an asynchronous CAN transport.
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next data frame from the bus.
    async fn recv_frame(&mut self) -> Result<CanFrame, GatewayError>;
}

/// Forward frames from a source into the ring until the source fails.
pub async fn pump_frames<S: FrameSource>(mut source: S, ring: FrameRing) -> GatewayError {
    loop {
        match source.recv_frame().await {
            Ok(frame) => {
                ring.push(frame);
            }
            Err(e) => return e,
        }
    }
}

/// Bounded single-producer/single-consumer ingress queue.
#[derive(Debug, Clone)]
pub struct FrameRing {
    queue: Arc<ArrayQueue<CanFrame>>,
    dropped: Arc<AtomicU64>,
}

impl FrameRing {
    pub fn new(capacity: usize) -> Self {
        FrameRing {
            queue: Arc::new(ArrayQueue::new(capacity.max(1))),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Enqueue a frame, overwriting the oldest one when full.
    ///
    /// Returns `false` if a frame was dropped to make room.
    pub fn push(&self, frame: CanFrame) -> bool {
        match self.queue.force_push(frame) {
            None => true,
            Some(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn pop(&self) -> Option<CanFrame> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Frames lost to overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
