//! # Elster Frame Envelope
//!
//! Elster requests and replies travel in 7 data bytes of a standard CAN frame.
//! The first two bytes address the endpoint, the rest carry the index and value:
//!
//! ```text
//! short index:     [prefix, sub, index,  value_hi, value_lo, 0,        0       ]
//! extended index:  [prefix, sub, 0xFA,   index_hi, index_lo, value_hi, value_lo]
//! ```
//!
//! The prefix is `((address >> 3) & 0xF0)` of the addressed module, with `1` in
//! the low nibble for reads, `2` for replies and `0` for writes. The sub-index is
//! `address & 7`. Indices from `0x100` upwards (and `0xFA` itself,
//! which would read as the escape) use the extended form.
//!
//! Parsing uses `nom`, packing builds fixed arrays.
//!
//! ```rust
//! use elster_rs::catalogue::{member_by_name, signal_by_name};
//! use elster_rs::elster::frame::{parse_frame, read_request};
//!
//! let heizmodul = member_by_name("HEIZMODUL").unwrap();
//! let data = read_request(heizmodul, signal_by_name("GERAETE_ID"));
//! assert_eq!(data, [0xA1, 0x00, 0x0C, 0x00, 0x00, 0x00, 0x00]);
//!
//! let frame = parse_frame(0x500, &data).unwrap();
//! assert_eq!(frame.index, 0x000C);
//! ```

use crate::catalogue::{Module, SignalDefinition};
use crate::constants::{
    ELSTER_EXTENDED_ESCAPE, ELSTER_EXTENDED_INDEX_MIN, ELSTER_FRAME_LEN, ELSTER_READ_FLAG,
    ELSTER_RESPONSE_FLAG,
};
use crate::error::GatewayError;
use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

/// Decoded Elster envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElsterFrame {
    /// CAN identifier of the sender
    pub source: u16,
    pub prefix: u8,
    pub sub_index: u8,
    pub index: u16,
    pub raw: u16,
    pub extended: bool,
}

impl ElsterFrame {
    pub fn is_read_request(&self) -> bool {
        self.prefix & 0x0F == ELSTER_READ_FLAG
    }

    pub fn is_response(&self) -> bool {
        self.prefix & 0x0F == ELSTER_RESPONSE_FLAG
    }
}

/// Whether an index must be sent in the extended envelope.
pub fn needs_extended(index: u16) -> bool {
    index >= ELSTER_EXTENDED_INDEX_MIN || index == u16::from(ELSTER_EXTENDED_ESCAPE)
}

/// Parse the data bytes of a received frame.
///
/// Frames with fewer than seven bytes are rejected; extra bytes are ignored.
pub fn parse_frame(source: u16, data: &[u8]) -> Result<ElsterFrame, GatewayError> {
    if data.len() < ELSTER_FRAME_LEN {
        return Err(GatewayError::MalformedFrame(data.len()));
    }
    let (_, (prefix, sub_index, index, raw, extended)) = parse_envelope(&data[..ELSTER_FRAME_LEN])
        .map_err(|_| GatewayError::MalformedFrame(data.len()))?;

    Ok(ElsterFrame {
        source,
        prefix,
        sub_index,
        index,
        raw,
        extended,
    })
}

fn parse_envelope(input: &[u8]) -> IResult<&[u8], (u8, u8, u16, u16, bool)> {
    let (input, prefix) = be_u8(input)?;
    let (input, sub_index) = be_u8(input)?;
    let (input, marker) = be_u8(input)?;

    if marker == ELSTER_EXTENDED_ESCAPE {
        let (input, index) = be_u16(input)?;
        let (input, raw) = be_u16(input)?;
        Ok((input, (prefix, sub_index, index, raw, true)))
    } else {
        let (input, raw) = be_u16(input)?;
        let (input, _padding) = take(2usize)(input)?;
        Ok((input, (prefix, sub_index, u16::from(marker), raw, false)))
    }
}

/// Data bytes of a read request for `signal` addressed to `member`.
pub fn read_request(member: &Module, signal: &SignalDefinition) -> [u8; ELSTER_FRAME_LEN] {
    pack(member.read_prefix(), member.sub_index(), signal.index, 0)
}

/// Data bytes of a write request carrying `raw`.
pub fn write_request(member: &Module, signal: &SignalDefinition, raw: u16) -> [u8; ELSTER_FRAME_LEN] {
    pack(member.write_prefix(), member.sub_index(), signal.index, raw)
}

/// Data bytes of a reply to `recipient` carrying `raw`, as a module sends it.
pub fn response(recipient: &Module, signal: &SignalDefinition, raw: u16) -> [u8; ELSTER_FRAME_LEN] {
    pack(
        recipient.address_nibble() | ELSTER_RESPONSE_FLAG,
        recipient.sub_index(),
        signal.index,
        raw,
    )
}

fn pack(prefix: u8, sub_index: u8, index: u16, raw: u16) -> [u8; ELSTER_FRAME_LEN] {
    let [index_hi, index_lo] = index.to_be_bytes();
    let [value_hi, value_lo] = raw.to_be_bytes();

    if needs_extended(index) {
        [prefix, sub_index, ELSTER_EXTENDED_ESCAPE, index_hi, index_lo, value_hi, value_lo]
    } else {
        [prefix, sub_index, index_lo, value_hi, value_lo, 0x00, 0x00]
    }
}
