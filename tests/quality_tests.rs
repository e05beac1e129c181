//! Value classification and blacklist hysteresis.

use elster_rs::elster::value::{decode_value, ValueType};
use elster_rs::quality::{is_invalid_value, QualityTracker, Transition};
use proptest::prelude::*;

/// The not-available raw value is invalid for every type that maps it.
#[test]
fn test_not_available_is_invalid() {
    for ty in ValueType::ALL.iter().copied().filter(|t| t.maps_not_available()) {
        let value = decode_value(ty, 0x8000);
        assert_eq!(value, "-255");
        assert!(is_invalid_value(&value, ty), "{ty}");
    }
}

/// Ordinary readings pass.
#[test]
fn test_plausible_values_pass() {
    assert!(!is_invalid_value(&decode_value(ValueType::DecVal, 213), ValueType::DecVal));
    assert!(!is_invalid_value(&decode_value(ValueType::Bool, 1), ValueType::Bool));
    assert!(!is_invalid_value(&decode_value(ValueType::DevId, 0x0102), ValueType::DevId));
    assert!(!is_invalid_value(&decode_value(ValueType::ErrNr, 4), ValueType::ErrNr));
    assert!(!is_invalid_value("0", ValueType::Default));
}

/// Out-of-range numbers are invalid whatever the type.
#[test]
fn test_out_of_range_numbers() {
    assert!(is_invalid_value(&decode_value(ValueType::DoubleVal, 5000), ValueType::DoubleVal));
    assert!(is_invalid_value(&decode_value(ValueType::Default, 0x7FFF), ValueType::Default));
    assert!(is_invalid_value(&decode_value(ValueType::CentVal, 0x7FFF), ValueType::CentVal));
}

/// Threshold invalids blacklist, one valid reply recovers.
#[test]
fn test_blacklist_and_recover() {
    let mut tracker = QualityTracker::new(3, 10);
    assert_eq!(tracker.on_invalid("KESSEL_X"), Transition::Unchanged);
    assert_eq!(tracker.on_invalid("KESSEL_X"), Transition::Unchanged);
    assert_eq!(tracker.on_invalid("KESSEL_X"), Transition::Blacklisted);
    // staying invalid does not re-trigger
    assert_eq!(tracker.on_invalid("KESSEL_X"), Transition::Unchanged);
    assert!(tracker.is_blacklisted("KESSEL_X"));
    assert_eq!(tracker.on_valid("KESSEL_X"), Transition::Recovered);
    assert!(!tracker.is_blacklisted("KESSEL_X"));
    assert_eq!(tracker.state("KESSEL_X").invalid_streak, 0);
    assert_eq!(tracker.on_valid("KESSEL_X"), Transition::Unchanged);
}

/// Timeouts blacklist on their own threshold; a reply recovers.
#[test]
fn test_timeout_blacklist() {
    let mut tracker = QualityTracker::new(10, 2);
    assert_eq!(tracker.on_timeout("MANAGER_Y"), Transition::Unchanged);
    assert_eq!(tracker.on_timeout("MANAGER_Y"), Transition::Blacklisted);
    assert_eq!(tracker.no_response_keys(), vec!["MANAGER_Y".to_string()]);
    assert_eq!(tracker.on_valid("MANAGER_Y"), Transition::Recovered);
    assert!(tracker.no_response_keys().is_empty());
}

/// Keys are tracked independently.
#[test]
fn test_keys_independent() {
    let mut tracker = QualityTracker::new(2, 2);
    tracker.on_invalid("A");
    tracker.on_invalid("B");
    assert_eq!(tracker.on_invalid("A"), Transition::Blacklisted);
    assert!(!tracker.is_blacklisted("B"));
    assert_eq!(tracker.blacklisted_keys(), vec!["A".to_string()]);
    assert_eq!(tracker.invalid_keys(), vec!["A".to_string(), "B".to_string()]);
}

proptest! {
    /// Fewer invalids than the threshold followed by a valid reply never blacklists.
    #[test]
    fn prop_hysteresis(threshold in 1u16..20, runs in proptest::collection::vec(0u16..40, 1..10)) {
        let mut tracker = QualityTracker::new(threshold, threshold);
        for run in runs {
            let mut tripped = false;
            for i in 1..=run {
                let t = tracker.on_invalid("k");
                prop_assert_eq!(t == Transition::Blacklisted, i == threshold);
                tripped |= t == Transition::Blacklisted;
            }
            prop_assert_eq!(tracker.is_blacklisted("k"), run >= threshold);
            let recovered = tracker.on_valid("k") == Transition::Recovered;
            prop_assert_eq!(recovered, tripped);
            prop_assert!(!tracker.is_blacklisted("k"));
        }
    }
}
