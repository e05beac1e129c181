//! # Utility Modules
//!
//! Hex encoding/decoding and rate-limited logging shared by the bus
//! transports, the sink adapter and the CLI.

pub mod hex;
pub mod logging;

pub use hex::{decode_hex, encode_hex, format_hex_compact};
pub use logging::{log_frame_hex, LogThrottle};
