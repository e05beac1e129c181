//! # Hex Encoding/Decoding Utilities
//!
//! Hex helpers used for SLCAN lines, the `decode` CLI subcommand and frame
//! logging.
//!
//! ```rust
//! use elster_rs::util::hex::{decode_hex, encode_hex, format_hex_compact};
//!
//! let data = [0xD2, 0x00, 0xFA, 0x01, 0x76, 0x00, 0x01];
//! assert_eq!(encode_hex(&data), "d200fa01760001");
//! assert_eq!(decode_hex("D2 00 FA 01 76 00 01").unwrap(), data);
//! assert_eq!(format_hex_compact(&data[..2]), "d2 00");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to lowercase hex string
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Encode bytes to uppercase hex string, as SLCAN adapters expect
pub fn encode_hex_upper(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode hex string to bytes
///
/// Accepts both uppercase and lowercase hex characters.
/// Whitespace is stripped.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }
    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format bytes as "d2 00 fa" for log lines
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_case() {
        let data = [0xA1, 0x00, 0xFA];
        assert_eq!(encode_hex(&data), "a100fa");
        assert_eq!(encode_hex_upper(&data), "A100FA");
    }

    #[test]
    fn test_decode_with_whitespace() {
        assert_eq!(decode_hex("a1 00 0c").unwrap(), vec![0xA1, 0x00, 0x0C]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(decode_hex(""), Err(HexError::EmptyString));
        assert_eq!(decode_hex("  "), Err(HexError::EmptyString));
        assert_eq!(decode_hex("a10"), Err(HexError::OddLength(3)));
        assert!(matches!(decode_hex("GG"), Err(HexError::DecodeError(_))));
    }
}
