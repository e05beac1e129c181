//! # elster-rs - A Rust Gateway for Elster/Stiebel Eltron Heat Pump CAN Buses
//!
//! The elster-rs crate bridges the CAN bus of Elster-based heat pumps (Stiebel Eltron,
//! Tecalor) to a publish/subscribe telemetry system such as an MQTT broker with Home
//! Assistant discovery.
//!
//! ## Features
//!
//! - Encode and decode the 7-byte Elster read, write and reply frames, including the
//!   extended index envelope
//! - Decode raw 16-bit values for 17 value types (temperatures, energy, dates, modes,
//!   error codes, device identifiers) and encode host input back for writes
//! - Poll a configurable request table at a bounded bus load with phase spreading
//!   and jitter
//! - Track value quality and blacklist signals that keep answering with sentinels or
//!   do not answer at all, recovering them on the first valid reply
//! - Derive secondary values (delta T, compressor activity, coefficients of
//!   performance, date and time strings)
//! - Advertise and retract entities on a discovery-aware sink
//! - SLCAN serial adapters and, on Linux, SocketCAN interfaces
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! elster-rs = "0.3.0"
//! ```
//!
//! ```rust
//! use elster_rs::{decode, encode_write};
//!
//! let reading = decode(0x180, &[0xD2, 0x00, 0x0E, 0x00, 0xDC, 0x00, 0x00]).unwrap();
//! assert_eq!(reading.member.name, "KESSEL");
//! assert_eq!(reading.signal.name, "SPEICHERISTTEMP");
//! assert_eq!(reading.value, "22.0");
//!
//! let frame = encode_write("KESSEL", "EINSTELL_SPEICHERSOLLTEMP", "48.5").unwrap();
//! assert_eq!(frame, [0x30, 0x00, 0x13, 0x01, 0xE5, 0x00, 0x00]);
//! ```
//!
//! The long-running side is the [`Gateway`]: feed its [`bus::FrameRing`] from a
//! transport, call [`Gateway::poll`] periodically and it drives everything else.

pub mod bus;
pub mod catalogue;
pub mod clock;
pub mod config;
pub mod constants;
pub mod derived;
pub mod elster;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod quality;
pub mod scheduler;
pub mod sink;
pub mod util;

pub use crate::error::GatewayError;
pub use crate::logging::{init_logger_with_default, log_info};

// Core types
pub use bus::{CanBus, CanFrame, FrameRing, MockBus};
pub use catalogue::{Module, SignalDefinition};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::GatewayConfig;
pub use elster::{ElsterFrame, ValueType};
pub use gateway::{Gateway, GatewayStats};
pub use quality::{QualityTracker, Transition};
pub use scheduler::{Request, Scheduler};
pub use sink::{RecordingSink, Sink, SinkAdapter};

/// A decoded frame together with the catalogue entries it refers to.
#[derive(Debug, Clone)]
pub struct Reading {
    pub member: &'static Module,
    pub signal: &'static SignalDefinition,
    pub value: String,
    pub frame: ElsterFrame,
}

/// Decode one received CAN frame.
///
/// # Arguments
/// * `source` - CAN identifier of the sender
/// * `data` - Frame payload, at least seven bytes
///
/// # Returns
/// * `Ok(Reading)` - Sender, signal and decoded value. Unknown senders resolve to
///   [`catalogue::UNKNOWN_MODULE`], unknown indices to [`catalogue::SENTINEL_SIGNAL`]
/// * `Err(GatewayError)` - The payload is too short
pub fn decode(source: u16, data: &[u8]) -> Result<Reading, GatewayError> {
    let frame = elster::parse_frame(source, data)?;
    let signal = catalogue::signal_by_index(frame.index);
    Ok(Reading {
        member: catalogue::member_by_address(source),
        signal,
        value: signal.decode_raw(frame.raw),
        frame,
    })
}

/// Build the read request frame for a signal on a module.
///
/// # Arguments
/// * `member` - Module name, e.g. `"KESSEL"`
/// * `signal` - Signal name, e.g. `"SPEICHERISTTEMP"`
///
/// # Returns
/// * `Ok([u8; 7])` - Frame payload to send from the PC address
/// * `Err(GatewayError)` - Unknown module or signal
pub fn encode_read(member: &str, signal: &str) -> Result<[u8; 7], GatewayError> {
    let (module, definition) = catalogue::resolve(member, signal)?;
    Ok(elster::read_request(module, definition))
}

/// Build the write request frame carrying `text` for a signal on a module.
///
/// # Arguments
/// * `member` - Module name
/// * `signal` - Signal name
/// * `text` - Value in the signal's textual representation
///
/// # Returns
/// * `Ok([u8; 7])` - Frame payload to send from the PC address
/// * `Err(GatewayError)` - Unknown module or signal, read-only type, or unparseable text
pub fn encode_write(member: &str, signal: &str, text: &str) -> Result<[u8; 7], GatewayError> {
    let (module, definition) = catalogue::resolve(member, signal)?;
    let raw = definition.encode_text(text)?;
    Ok(elster::write_request(module, definition, raw))
}
