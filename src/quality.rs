//! # Value Quality and Dynamic Blacklist
//!
//! Every `(member, signal)` key carries two independent streaks:
//!
//! - `invalid_streak` counts consecutive replies whose value is a firmware
//!   sentinel, out of range or garbled.
//! - `no_response_streak` counts consecutive requests that timed out.
//!
//! Either streak reaching its threshold blacklists the key. The scheduler stops
//! polling blacklisted keys and the sink retracts their entities. The first valid
//! reply resets both streaks and lifts the blacklist.
//!
//! ```rust
//! use elster_rs::quality::{QualityTracker, Transition};
//!
//! let mut tracker = QualityTracker::new(3, 3);
//! tracker.on_invalid("KESSEL_RAUMISTTEMP");
//! tracker.on_invalid("KESSEL_RAUMISTTEMP");
//! assert_eq!(tracker.on_invalid("KESSEL_RAUMISTTEMP"), Transition::Blacklisted);
//! assert_eq!(tracker.on_valid("KESSEL_RAUMISTTEMP"), Transition::Recovered);
//! ```

use crate::constants::{
    INVALID_SENTINELS, INVALID_TEXTS, INVALID_VALUE_EPSILON, INVALID_VALUE_MAX, INVALID_VALUE_MIN,
};
use crate::elster::value::ValueType;
use std::collections::HashMap;

/// State words that are never treated as invalid.
const STATE_WORDS: &[&str] = &["on", "off", "ja", "nein"];

/// Whether a decoded value must be discarded instead of published.
pub fn is_invalid_value(value: &str, value_type: ValueType) -> bool {
    let trimmed = value.trim();
    if STATE_WORDS.iter().any(|w| trimmed.eq_ignore_ascii_case(w)) {
        return false;
    }
    if INVALID_TEXTS.contains(&trimmed) {
        return true;
    }

    if let Ok(number) = trimmed.parse::<f64>() {
        if !number.is_finite() || !(INVALID_VALUE_MIN..=INVALID_VALUE_MAX).contains(&number) {
            return true;
        }
        return INVALID_SENTINELS
            .iter()
            .any(|s| (number - s).abs() <= INVALID_VALUE_EPSILON);
    }

    value_type.is_numeric()
        && trimmed
            .chars()
            .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | ' ')))
}

/// Per-key quality counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualityState {
    pub invalid_streak: u16,
    pub no_response_streak: u16,
    pub dynamic_blacklisted: bool,
}

/// Blacklist change caused by a single observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    /// The key just crossed a threshold
    Blacklisted,
    /// A blacklisted key produced a valid reply
    Recovered,
}

#[derive(Debug)]
pub struct QualityTracker {
    invalid_threshold: u16,
    timeout_threshold: u16,
    states: HashMap<String, QualityState>,
}

impl QualityTracker {
    pub fn new(invalid_threshold: u16, timeout_threshold: u16) -> Self {
        QualityTracker {
            invalid_threshold: invalid_threshold.max(1),
            timeout_threshold: timeout_threshold.max(1),
            states: HashMap::new(),
        }
    }

    pub fn on_valid(&mut self, key: &str) -> Transition {
        let Some(state) = self.states.get_mut(key) else {
            return Transition::Unchanged;
        };
        let was_blacklisted = state.dynamic_blacklisted;
        *state = QualityState::default();
        if was_blacklisted {
            Transition::Recovered
        } else {
            Transition::Unchanged
        }
    }

    pub fn on_invalid(&mut self, key: &str) -> Transition {
        let threshold = self.invalid_threshold;
        let state = self.states.entry(key.to_string()).or_default();
        state.invalid_streak = state.invalid_streak.saturating_add(1);
        Self::promote(state, state.invalid_streak >= threshold)
    }

    pub fn on_timeout(&mut self, key: &str) -> Transition {
        let threshold = self.timeout_threshold;
        let state = self.states.entry(key.to_string()).or_default();
        state.no_response_streak = state.no_response_streak.saturating_add(1);
        Self::promote(state, state.no_response_streak >= threshold)
    }

    fn promote(state: &mut QualityState, tripped: bool) -> Transition {
        if tripped && !state.dynamic_blacklisted {
            state.dynamic_blacklisted = true;
            Transition::Blacklisted
        } else {
            Transition::Unchanged
        }
    }

    pub fn is_blacklisted(&self, key: &str) -> bool {
        self.states.get(key).map_or(false, |s| s.dynamic_blacklisted)
    }

    pub fn state(&self, key: &str) -> QualityState {
        self.states.get(key).copied().unwrap_or_default()
    }

    /// Sorted keys currently blacklisted.
    pub fn blacklisted_keys(&self) -> Vec<String> {
        self.keys_where(|s| s.dynamic_blacklisted)
    }

    /// Sorted keys with a running invalid streak.
    pub fn invalid_keys(&self) -> Vec<String> {
        self.keys_where(|s| s.invalid_streak > 0)
    }

    /// Sorted keys with a running no-response streak.
    pub fn no_response_keys(&self) -> Vec<String> {
        self.keys_where(|s| s.no_response_streak > 0)
    }

    fn keys_where(&self, pred: impl Fn(&QualityState) -> bool) -> Vec<String> {
        let mut keys: Vec<String> = self
            .states
            .iter()
            .filter(|(_, s)| pred(s))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_sentinels() {
        for text in ["SNA", "---", "N/A", "", "  "] {
            assert!(is_invalid_value(text, ValueType::DecVal), "{text:?}");
        }
    }

    #[test]
    fn test_numeric_sentinels() {
        for text in ["-255", "-32768", "32767", "327.67", "-327.68", "-255.004"] {
            assert!(is_invalid_value(text, ValueType::Default), "{text}");
        }
        assert!(is_invalid_value("-300.1", ValueType::DecVal));
        assert!(is_invalid_value("1000.5", ValueType::DecVal));
        assert!(!is_invalid_value("-300.0", ValueType::DecVal));
        assert!(!is_invalid_value("21.3", ValueType::DecVal));
        assert!(!is_invalid_value("-254.9", ValueType::DecVal));
    }

    #[test]
    fn test_state_words_and_text_types() {
        assert!(!is_invalid_value("on", ValueType::Bool));
        assert!(!is_invalid_value("Nein", ValueType::Default));
        assert!(!is_invalid_value("12:30", ValueType::Zeit));
        assert!(!is_invalid_value("Automatik", ValueType::Betriebsart));
        assert!(is_invalid_value("12x", ValueType::DecVal));
        assert!(!is_invalid_value("12x", ValueType::DevId));
    }

    #[test]
    fn test_streaks_are_independent() {
        let mut tracker = QualityTracker::new(2, 2);
        assert_eq!(tracker.on_invalid("k"), Transition::Unchanged);
        assert_eq!(tracker.on_timeout("k"), Transition::Unchanged);
        assert_eq!(tracker.state("k").invalid_streak, 1);
        assert_eq!(tracker.state("k").no_response_streak, 1);
        assert_eq!(tracker.on_timeout("k"), Transition::Blacklisted);
        assert_eq!(tracker.on_invalid("k"), Transition::Unchanged);
        assert!(tracker.is_blacklisted("k"));
    }

    #[test]
    fn test_diagnostic_lists() {
        let mut tracker = QualityTracker::new(1, 5);
        tracker.on_invalid("b");
        tracker.on_timeout("a");
        assert_eq!(tracker.blacklisted_keys(), vec!["b".to_string()]);
        assert_eq!(tracker.invalid_keys(), vec!["b".to_string()]);
        assert_eq!(tracker.no_response_keys(), vec!["a".to_string()]);
        tracker.on_valid("b");
        assert!(tracker.blacklisted_keys().is_empty());
    }
}
