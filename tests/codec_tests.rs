//! Value codec tests over the public `elster::value` API.

use elster_rs::elster::value::{decode_value, encode_value, EncodeError, ValueType};
use proptest::prelude::*;

/// Decoding of the integer and unsigned display types.
#[test]
fn test_decode_integer_types() {
    assert_eq!(decode_value(ValueType::Default, 0xFFFB), "-5");
    assert_eq!(decode_value(ValueType::Byte, 0x00FF), "-1");
    assert_eq!(decode_value(ValueType::Byte, 0x1205), "5");
    assert_eq!(decode_value(ValueType::LittleEndian, 0x3412), "4660");
    assert_eq!(decode_value(ValueType::DoubleVal, 1234), "1234.000");
    assert_eq!(decode_value(ValueType::TripleVal, 5), "5.000000");
}

/// Boolean types decode on, off and anything else as `?`.
#[test]
fn test_decode_booleans() {
    assert_eq!(decode_value(ValueType::Bool, 0x0001), "on");
    assert_eq!(decode_value(ValueType::Bool, 0x0000), "off");
    assert_eq!(decode_value(ValueType::Bool, 0x0002), "?");
    assert_eq!(decode_value(ValueType::LittleBool, 0x0100), "on");
    assert_eq!(decode_value(ValueType::LittleBool, 0x0001), "?");
}

/// Dictionary-backed types fall back to `?` or `ERR n`.
#[test]
fn test_decode_dictionary_types() {
    assert_eq!(decode_value(ValueType::Betriebsart, 0x0200), "Automatik");
    assert_eq!(decode_value(ValueType::Betriebsart, 0x0700), "Sommerbetrieb");
    assert_eq!(decode_value(ValueType::Betriebsart, 0x0201), "?");
    assert_eq!(decode_value(ValueType::Betriebsart, 0x0900), "?");
    assert_eq!(decode_value(ValueType::ErrNr, 0x0004), "Hochdruck");
    assert_eq!(decode_value(ValueType::ErrNr, 99), "ERR 99");
}

/// Device numbers and identifiers.
#[test]
fn test_decode_device_types() {
    assert_eq!(decode_value(ValueType::DevNr, 0x0003), "4");
    assert_eq!(decode_value(ValueType::DevNr, 0x0080), "--");
    assert_eq!(decode_value(ValueType::DevId, 0x0102), "1-02");
    assert_eq!(decode_value(ValueType::DevId, 0x8000), "-255");
}

/// Integer encodes accept -0x7fff..=0xffff.
#[test]
fn test_encode_integer_bounds() {
    assert_eq!(encode_value(ValueType::Default, "-5"), Ok(0xFFFB));
    assert_eq!(encode_value(ValueType::Default, "65535"), Ok(0xFFFF));
    assert_eq!(encode_value(ValueType::Default, "-32767"), Ok(0x8001));
    assert!(matches!(encode_value(ValueType::Default, "65536"), Err(EncodeError::OutOfRange(_))));
    assert!(matches!(encode_value(ValueType::Default, "-32768"), Err(EncodeError::OutOfRange(_))));
    assert!(matches!(encode_value(ValueType::Default, "abc"), Err(EncodeError::Unparseable(_))));
    assert!(matches!(encode_value(ValueType::Default, "12abc"), Err(EncodeError::Unparseable(_))));
    assert_eq!(encode_value(ValueType::LittleEndian, "4660"), Ok(0x3412));
}

/// Byte encodes stay within one byte.
#[test]
fn test_encode_byte() {
    assert_eq!(encode_value(ValueType::Byte, "-1"), Ok(0x00FF));
    assert_eq!(encode_value(ValueType::Byte, "255"), Ok(0x00FF));
    assert!(matches!(encode_value(ValueType::Byte, "256"), Err(EncodeError::OutOfRange(_))));
}

/// Scaled encodes round to the nearest step and reject non-finite input.
#[test]
fn test_encode_scaled() {
    assert_eq!(encode_value(ValueType::DecVal, "21.34"), Ok(213));
    assert_eq!(encode_value(ValueType::DecVal, " 48.5 "), Ok(485));
    assert_eq!(encode_value(ValueType::DecVal, "-1.0"), Ok(0xFFF6));
    assert_eq!(encode_value(ValueType::CentVal, "1.5"), Ok(150));
    assert_eq!(encode_value(ValueType::MilVal, "0.25"), Ok(250));
    assert!(matches!(encode_value(ValueType::DecVal, "3276.8"), Err(EncodeError::OutOfRange(_))));
    assert!(matches!(encode_value(ValueType::DecVal, "NaN"), Err(EncodeError::Unparseable(_))));
    assert!(matches!(encode_value(ValueType::DecVal, "inf"), Err(EncodeError::Unparseable(_))));
}

/// Boolean and mode encodes take their textual names.
#[test]
fn test_encode_named_values() {
    assert_eq!(encode_value(ValueType::Bool, "on"), Ok(1));
    assert_eq!(encode_value(ValueType::Bool, "off"), Ok(0));
    assert_eq!(encode_value(ValueType::LittleBool, "on"), Ok(0x0100));
    assert!(encode_value(ValueType::Bool, "yes").is_err());
    assert_eq!(encode_value(ValueType::Betriebsart, "Warmwasser"), Ok(0x0500));
    assert!(encode_value(ValueType::Betriebsart, "Turbo").is_err());
}

/// Device numbers encode `--` and 1-based numbers.
#[test]
fn test_encode_dev_nr() {
    assert_eq!(encode_value(ValueType::DevNr, "--"), Ok(0x80));
    assert_eq!(encode_value(ValueType::DevNr, "1"), Ok(0));
    assert_eq!(encode_value(ValueType::DevNr, "128"), Ok(127));
    assert!(matches!(encode_value(ValueType::DevNr, "0"), Err(EncodeError::OutOfRange(_))));
    assert!(matches!(encode_value(ValueType::DevNr, "129"), Err(EncodeError::OutOfRange(_))));
}

/// Every type reports a stable name.
#[test]
fn test_type_names_unique() {
    let mut names: Vec<&str> = ValueType::ALL.iter().map(|t| t.name()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), ValueType::ALL.len());
    assert_eq!(ValueType::DecVal.to_string(), "dec_val");
}

proptest! {
    /// Writable non-numeric types survive decode then encode.
    #[test]
    fn prop_named_types_roundtrip(mode in 0u16..8, hour in 0u16..24, minute in 0u16..60) {
        let raw = mode << 8;
        prop_assert_eq!(encode_value(ValueType::Betriebsart, &decode_value(ValueType::Betriebsart, raw)), Ok(raw));
        let zeit = (minute << 8) | hour;
        prop_assert_eq!(encode_value(ValueType::Zeit, &decode_value(ValueType::Zeit, zeit)), Ok(zeit));
    }

    /// Decoding never panics for any type and raw value.
    #[test]
    fn prop_decode_total(raw in any::<u16>()) {
        for ty in ValueType::ALL {
            let _ = decode_value(ty, raw);
        }
    }
}
