//! # Elster Value Codec
//!
//! Every Elster signal carries a 16-bit raw value whose meaning depends on the
//! signal's [`ValueType`]. This module turns raw values into the strings published
//! downstream and parses user input back into raw values for write requests.
//!
//! Decoding is total: odd raw values render as `"?"`, `"ERR n"` or the `"-255"`
//! not-available marker. Encoding fails with an [`EncodeError`] when the text does
//! not parse or does not fit the type.
//!
//! ## Usage
//!
//! ```rust
//! use elster_rs::elster::value::{decode_value, encode_value, ValueType};
//!
//! assert_eq!(decode_value(ValueType::DecVal, 0x00C8), "20.0");
//! assert_eq!(encode_value(ValueType::DecVal, "20.0").unwrap(), 0x00C8);
//! assert_eq!(decode_value(ValueType::DecVal, 0x8000), "-255");
//! ```

use crate::catalogue::dictionaries::{error_name, mode_index, mode_name};
use crate::constants::{NOT_AVAILABLE_TEXT, RAW_NOT_AVAILABLE, RAW_TIME_DOMAIN_UNUSED};
use std::fmt;
use thiserror::Error;

/// Wire shapes of Elster signal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Signed 16-bit integer
    Default,
    /// Signed 16-bit in tenths
    DecVal,
    /// Signed 16-bit in hundredths
    CentVal,
    /// Signed 16-bit in thousandths
    MilVal,
    /// Signed 8-bit in the low byte
    Byte,
    /// Byte-swapped unsigned integer
    LittleEndian,
    /// `0x0001` on, `0x0000` off
    Bool,
    /// `0x0100` on, `0x0000` off
    LittleBool,
    /// Operating mode index in the high byte
    Betriebsart,
    /// Time of day, hour low and minute high
    Zeit,
    /// Date, day high and month low
    Datum,
    /// Quarter-hour switching window
    TimeDomain,
    /// Bus device number, `>= 0x80` means none
    DevNr,
    /// Device identification `hi-lo`
    DevId,
    /// Index into the error dictionary
    ErrNr,
    /// Unsigned value printed with three decimals
    DoubleVal,
    /// Unsigned value printed with six decimals
    TripleVal,
}

impl ValueType {
    pub const ALL: [ValueType; 17] = [
        ValueType::Default,
        ValueType::DecVal,
        ValueType::CentVal,
        ValueType::MilVal,
        ValueType::Byte,
        ValueType::LittleEndian,
        ValueType::Bool,
        ValueType::LittleBool,
        ValueType::Betriebsart,
        ValueType::Zeit,
        ValueType::Datum,
        ValueType::TimeDomain,
        ValueType::DevNr,
        ValueType::DevId,
        ValueType::ErrNr,
        ValueType::DoubleVal,
        ValueType::TripleVal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Default => "default",
            ValueType::DecVal => "dec_val",
            ValueType::CentVal => "cent_val",
            ValueType::MilVal => "mil_val",
            ValueType::Byte => "byte",
            ValueType::LittleEndian => "little_endian",
            ValueType::Bool => "bool",
            ValueType::LittleBool => "little_bool",
            ValueType::Betriebsart => "betriebsart",
            ValueType::Zeit => "zeit",
            ValueType::Datum => "datum",
            ValueType::TimeDomain => "time_domain",
            ValueType::DevNr => "dev_nr",
            ValueType::DevId => "dev_id",
            ValueType::ErrNr => "err_nr",
            ValueType::DoubleVal => "double_val",
            ValueType::TripleVal => "triple_val",
        }
    }

    /// Whether raw `0x8000` decodes to the `"-255"` not-available marker.
    pub fn maps_not_available(self) -> bool {
        !matches!(
            self,
            ValueType::Bool
                | ValueType::Betriebsart
                | ValueType::Zeit
                | ValueType::Datum
                | ValueType::TimeDomain
        )
    }

    /// Whether the decoded text is always a plain number.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueType::Default
                | ValueType::DecVal
                | ValueType::CentVal
                | ValueType::MilVal
                | ValueType::Byte
                | ValueType::LittleEndian
                | ValueType::DoubleVal
                | ValueType::TripleVal
        )
    }

    /// Whether a discovery descriptor may carry a `state_class`.
    pub fn has_state_class(self) -> bool {
        self.is_numeric() && self != ValueType::Default
    }

    pub fn is_binary(self) -> bool {
        matches!(self, ValueType::Bool | ValueType::LittleBool)
    }

    pub fn is_writable(self) -> bool {
        !matches!(
            self,
            ValueType::DevId | ValueType::ErrNr | ValueType::DoubleVal | ValueType::TripleVal
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors returned when host text cannot become a raw value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodeError {
    #[error("Cannot parse {0:?}")]
    Unparseable(String),

    #[error("Value {0:?} is out of range")]
    OutOfRange(String),

    #[error("Value type {0} is read-only")]
    ReadOnly(ValueType),
}

/// Decode a raw 16-bit value into its published string.
pub fn decode_value(value_type: ValueType, raw: u16) -> String {
    if raw == RAW_NOT_AVAILABLE && value_type.maps_not_available() {
        return NOT_AVAILABLE_TEXT.to_string();
    }

    match value_type {
        ValueType::Default => format!("{}", raw as i16),
        ValueType::Byte => format!("{}", raw as u8 as i8),
        ValueType::DecVal => format!("{:.1}", f64::from(raw as i16) / 10.0),
        ValueType::CentVal => format!("{:.2}", f64::from(raw as i16) / 100.0),
        ValueType::MilVal => format!("{:.3}", f64::from(raw as i16) / 1000.0),
        ValueType::LittleEndian => format!("{}", raw.swap_bytes()),
        ValueType::Bool => on_off(raw, 0x0001),
        ValueType::LittleBool => on_off(raw, 0x0100),
        ValueType::Betriebsart => {
            let mode = if raw & 0x00FF == 0 { mode_name(raw >> 8) } else { None };
            mode.unwrap_or("?").to_string()
        }
        ValueType::Zeit => format!("{:02}:{:02}", raw & 0xFF, raw >> 8),
        ValueType::Datum => format!("{:02}.{:02}.", raw >> 8, raw & 0xFF),
        ValueType::TimeDomain => {
            if raw & RAW_TIME_DOMAIN_UNUSED != 0 {
                "not used".to_string()
            } else {
                let start = raw >> 8;
                let end = raw & 0xFF;
                format!(
                    "{:02}:{:02}-{:02}:{:02}",
                    start / 4,
                    15 * (start % 4),
                    end / 4,
                    15 * (end % 4)
                )
            }
        }
        ValueType::DevNr => {
            if raw >= 0x80 {
                "--".to_string()
            } else {
                format!("{}", raw + 1)
            }
        }
        ValueType::DevId => format!("{}-{:02}", raw >> 8, raw & 0xFF),
        ValueType::ErrNr => match error_name(raw) {
            Some(name) => name.to_string(),
            None => format!("ERR {raw}"),
        },
        ValueType::DoubleVal => format!("{:.3}", f64::from(raw)),
        ValueType::TripleVal => format!("{:.6}", f64::from(raw)),
    }
}

fn on_off(raw: u16, on: u16) -> String {
    match raw {
        r if r == on => "on",
        0 => "off",
        _ => "?",
    }
    .to_string()
}

/// Encode host text into a raw 16-bit value for a write request.
///
/// Leading and trailing whitespace is ignored. The whole remaining text must be
/// consumed by the type's grammar.
pub fn encode_value(value_type: ValueType, text: &str) -> Result<u16, EncodeError> {
    let input = text.trim();
    let unparseable = || EncodeError::Unparseable(text.to_string());
    let out_of_range = || EncodeError::OutOfRange(text.to_string());

    match value_type {
        ValueType::Default | ValueType::LittleEndian => {
            let i: i64 = input.parse().map_err(|_| unparseable())?;
            if !(-0x7FFF..=0xFFFF).contains(&i) {
                return Err(out_of_range());
            }
            let raw = i as u16;
            Ok(if value_type == ValueType::LittleEndian {
                raw.swap_bytes()
            } else {
                raw
            })
        }
        ValueType::Byte => {
            let i: i64 = input.parse().map_err(|_| unparseable())?;
            if !(-0x80..=0xFF).contains(&i) {
                return Err(out_of_range());
            }
            Ok(u16::from(i as u8))
        }
        ValueType::Bool | ValueType::LittleBool => {
            let bit = match input {
                "on" => 1,
                "off" => 0,
                _ => return Err(unparseable()),
            };
            Ok(if value_type == ValueType::LittleBool {
                bit << 8
            } else {
                bit
            })
        }
        ValueType::Betriebsart => mode_index(input)
            .map(|index| index << 8)
            .ok_or_else(unparseable),
        ValueType::DecVal | ValueType::CentVal | ValueType::MilVal => {
            let d: f64 = input.parse().map_err(|_| unparseable())?;
            if !d.is_finite() {
                return Err(unparseable());
            }
            let scale = match value_type {
                ValueType::DecVal => 10.0,
                ValueType::CentVal => 100.0,
                _ => 1000.0,
            };
            let scaled = (d * scale).round();
            if !(-0x7FFF as f64..=0x7FFF as f64).contains(&scaled) {
                return Err(out_of_range());
            }
            Ok(scaled as i16 as u16)
        }
        ValueType::Zeit => {
            let (hour, minute) = parse_clock(input).ok_or_else(unparseable)?;
            if hour >= 24 {
                return Err(out_of_range());
            }
            Ok((minute << 8) | hour)
        }
        ValueType::Datum => {
            let body = input.strip_suffix('.').ok_or_else(unparseable)?;
            let (day, month) = body.split_once('.').ok_or_else(unparseable)?;
            let day: u16 = day.parse().map_err(|_| unparseable())?;
            let month: u16 = month.parse().map_err(|_| unparseable())?;
            if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
                return Err(out_of_range());
            }
            let max_day = match month {
                2 => 28,
                4 | 6 | 9 | 11 => 30,
                _ => 31,
            };
            if day > max_day {
                return Err(out_of_range());
            }
            Ok((day << 8) | month)
        }
        ValueType::TimeDomain => {
            if input.is_empty() {
                return Ok(RAW_TIME_DOMAIN_UNUSED);
            }
            let (from, to) = input.split_once('-').ok_or_else(unparseable)?;
            let (h1, m1) = parse_clock(from).ok_or_else(unparseable)?;
            let (h2, m2) = parse_clock(to).ok_or_else(unparseable)?;
            let start = 4 * h1 + m1 / 15;
            let end = 4 * h2 + m2 / 15;
            if start >= end {
                return Err(out_of_range());
            }
            Ok((start << 8) | end)
        }
        ValueType::DevNr => {
            if input == "--" {
                return Ok(0x80);
            }
            let n: u16 = input.parse().map_err(|_| unparseable())?;
            if !(1..=0x80).contains(&n) {
                return Err(out_of_range());
            }
            Ok(n - 1)
        }
        ValueType::DevId | ValueType::ErrNr | ValueType::DoubleVal | ValueType::TripleVal => {
            Err(EncodeError::ReadOnly(value_type))
        }
    }
}

/// Parses `H:M`, allowing `24:00` as the end of day.
fn parse_clock(text: &str) -> Option<(u16, u16)> {
    let (hour, minute) = text.trim().split_once(':')?;
    let hour: u16 = hour.parse().ok()?;
    let minute: u16 = minute.parse().ok()?;
    if hour > 24 || minute >= 60 || (hour == 24 && minute != 0) {
        return None;
    }
    Some((hour, minute))
}
