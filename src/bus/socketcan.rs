//! # SocketCAN Transport
//!
//! Native Linux CAN interfaces (`can0`, `vcan0`). Two sockets are bound to the
//! interface: one written by the control loop, one read by a dedicated thread
//! that feeds the [`FrameRing`].

use crate::bus::{CanBus, CanFrame, FrameRing};
use crate::error::GatewayError;
use crate::logging::{log_error, log_info};
use socketcan::{CanDataFrame, CanSocket, EmbeddedFrame, Id, Socket, StandardId};
use std::thread::JoinHandle;

/// Transmitting side of a SocketCAN interface.
pub struct SocketCanBus {
    socket: CanSocket,
}

impl SocketCanBus {
    pub fn open(interface: &str) -> Result<Self, GatewayError> {
        let socket = CanSocket::open(interface)
            .map_err(|e| GatewayError::Bus(format!("{interface}: {e}")))?;
        socket.set_nonblocking(true)?;
        Ok(SocketCanBus { socket })
    }
}

impl CanBus for SocketCanBus {
    fn send_frame(&mut self, frame: &CanFrame) -> Result<(), GatewayError> {
        let id = StandardId::new(frame.id)
            .ok_or_else(|| GatewayError::Bus(format!("invalid identifier 0x{:X}", frame.id)))?;
        let data = CanDataFrame::new(id, frame.data())
            .ok_or_else(|| GatewayError::Bus("frame payload exceeds 8 bytes".into()))?;
        self.socket
            .write_frame(&data)
            .map_err(|e| GatewayError::Bus(e.to_string()))
    }
}

/// Start a thread that pushes every standard data frame into `ring`.
///
/// The thread ends when the socket reports an error.
pub fn spawn_reader(interface: &str, ring: FrameRing) -> Result<JoinHandle<()>, GatewayError> {
    let socket = CanSocket::open(interface)
        .map_err(|e| GatewayError::Bus(format!("{interface}: {e}")))?;
    let name = interface.to_string();

    let handle = std::thread::Builder::new()
        .name(format!("can-rx-{name}"))
        .spawn(move || {
            log_info(&format!("SocketCAN reader started on {name}"));
            loop {
                match socket.read_frame() {
                    Ok(socketcan::CanFrame::Data(frame)) => {
                        if let Id::Standard(sid) = frame.id() {
                            if let Ok(frame) = CanFrame::new(sid.as_raw(), frame.data()) {
                                ring.push(frame);
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        log_error(&format!("SocketCAN read on {name} failed: {e}"));
                        break;
                    }
                }
            }
        })?;
    Ok(handle)
}
