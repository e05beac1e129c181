//! # Signal Catalogue
//!
//! Static tables describing the bus: modules by address, signals by Elster index
//! and name, the error and operating-mode dictionaries, and the default polling
//! table.
//!
//! Failed signal lookups never error. They return [`SENTINEL_SIGNAL`] (index
//! `0xFFFF`, empty name), which the rest of the gateway treats as "ignore".
//! Failed address lookups return [`UNKNOWN_MODULE`].

pub mod dictionaries;
pub mod members;
pub mod requests;
pub mod signals;

pub use members::{Module, ALL_MEMBERS, ALL_MEMBERS_NAME, MODULES, UNKNOWN_MODULE};
pub use signals::{SignalDefinition, SignalMeta, SENTINEL_SIGNAL, SIGNALS};

use crate::error::GatewayError;
use once_cell::sync::Lazy;
use std::collections::HashMap;

static SIGNALS_BY_INDEX: Lazy<HashMap<u16, &'static SignalDefinition>> =
    Lazy::new(|| SIGNALS.iter().map(|s| (s.index, s)).collect());

static SIGNALS_BY_NAME: Lazy<HashMap<&'static str, &'static SignalDefinition>> =
    Lazy::new(|| SIGNALS.iter().map(|s| (s.name, s)).collect());

/// Module at a CAN address, or [`UNKNOWN_MODULE`].
pub fn member_by_address(address: u16) -> &'static Module {
    MODULES
        .iter()
        .find(|m| m.address == address)
        .unwrap_or(&UNKNOWN_MODULE)
}

pub fn member_by_name(name: &str) -> Option<&'static Module> {
    MODULES.iter().find(|m| m.name == name)
}

/// Signal with an Elster index, or [`SENTINEL_SIGNAL`].
pub fn signal_by_index(index: u16) -> &'static SignalDefinition {
    SIGNALS_BY_INDEX
        .get(&index)
        .copied()
        .unwrap_or(&SENTINEL_SIGNAL)
}

/// Signal with a name, or [`SENTINEL_SIGNAL`].
pub fn signal_by_name(name: &str) -> &'static SignalDefinition {
    SIGNALS_BY_NAME
        .get(name)
        .copied()
        .unwrap_or(&SENTINEL_SIGNAL)
}

/// Module and signal for a host request naming both.
///
/// Permanently blacklisted signals resolve; callers decide whether to refuse them.
pub fn resolve(
    member: &str,
    signal: &str,
) -> Result<(&'static Module, &'static SignalDefinition), GatewayError> {
    let module = member_by_name(member).ok_or_else(|| GatewayError::UnknownMember(member.to_string()))?;
    let definition = signal_by_name(signal);
    if definition.is_sentinel() {
        return Err(GatewayError::UnknownSignal(signal.to_string()));
    }
    Ok((module, definition))
}

/// Whether the catalogue marks the signal as never to be polled or processed.
pub fn is_permanently_blacklisted(name: &str) -> bool {
    signal_by_name(name).blacklisted
}
