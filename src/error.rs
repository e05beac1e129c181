//! # Gateway Error Handling
//!
//! This module defines the GatewayError enum, which represents the different error
//! types that can occur in the elster-rs crate.
//!
//! Decoding never fails: unknown indices resolve to the catalogue sentinel and odd
//! raw values render as `"?"`, `"ERR n"` or `"-255"`. Errors are reserved for host
//! input that cannot be encoded, malformed frames, and the outer transports.

use crate::elster::value::ValueType;
use crate::util::hex::HexError;
use thiserror::Error;

/// Represents the different error types that can occur in the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The text given for a write could not be encoded for the signal's type.
    #[error("Cannot encode {input:?} for signal {signal}")]
    Encode { signal: String, input: String },

    /// The value type has no string to raw encoding.
    #[error("Value type {0} is read-only")]
    NotWritable(ValueType),

    /// No signal with this name exists in the catalogue.
    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    /// No module with this name exists in the catalogue.
    #[error("Unknown member: {0}")]
    UnknownMember(String),

    /// The signal is permanently blacklisted and must never be requested.
    #[error("Signal {0} is permanently blacklisted")]
    Blacklisted(String),

    /// A frame carried fewer than the seven Elster data bytes.
    #[error("Malformed frame: {0} data bytes")]
    MalformedFrame(usize),

    /// Indicates an error in the CAN transport.
    #[error("Bus error: {0}")]
    Bus(String),

    /// Indicates an error in the telemetry sink.
    #[error("Sink error: {0}")]
    Sink(String),

    /// Indicates an invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Indicates an I/O error while reading files or devices.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Indicates a JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Indicates an invalid hexadecimal string.
    #[error("Invalid hex: {0}")]
    Hex(#[from] HexError),
}
