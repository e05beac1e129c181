//! # Gateway Configuration
//!
//! All tunables of the control loop, the sink naming and the transports.
//! Every field has a default matching the WPL 13 E firmware, so a partial JSON
//! file only needs the fields it changes:
//!
//! ```json
//! {
//!   "startup_delay_ms": 5000,
//!   "requests": [
//!     { "signal": "WPVORLAUFIST", "frequency_s": 30, "member": "HEIZMODUL" }
//!   ],
//!   "mqtt": { "host": "broker.local" }
//! }
//! ```

use crate::catalogue::{self, requests::default_requests, ALL_MEMBERS_NAME};
use crate::constants::*;
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One row of the polling table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRow {
    pub signal: String,
    /// Polling period in seconds
    pub frequency_s: u32,
    /// Module name, or `"ALL"` for every main module
    pub member: String,
}

impl RequestRow {
    pub fn new(signal: &str, frequency_s: u32, member: &str) -> Self {
        RequestRow {
            signal: signal.to_string(),
            frequency_s,
            member: member.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        MqttConfig {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "elster-gateway".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Slcan,
    Socketcan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub transport: Transport,
    /// Serial device of an SLCAN adapter
    pub port: String,
    pub baudrate: u32,
    /// SocketCAN interface name
    pub interface: String,
    /// CAN bitrate set on SLCAN adapters
    pub bitrate: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            transport: Transport::Slcan,
            port: "/dev/ttyACM0".to_string(),
            baudrate: 115_200,
            interface: "can0".to_string(),
            bitrate: 20_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub startup_delay_ms: u64,
    pub can_request_timeout_ms: u64,
    pub max_requests_per_iteration: usize,
    pub min_random_delay_ms: u64,
    pub max_random_delay_ms: u64,
    pub blacklist_invalid_threshold: u16,
    pub blacklist_timeout_threshold: u16,
    pub cop_min_divisor: f64,
    pub app_prefix: String,
    pub uid_prefix: String,
    pub discovery_prefix: String,
    pub main_device_id: String,
    pub main_device_name: String,
    pub main_device_model: String,
    pub tick_interval_ms: u64,
    pub diagnostics_interval_ms: u64,
    pub ring_capacity: usize,
    /// Empty means the built-in WPL 13 E table
    pub requests: Vec<RequestRow>,
    pub mqtt: MqttConfig,
    pub bus: BusConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            startup_delay_ms: DEFAULT_STARTUP_DELAY_MS,
            can_request_timeout_ms: DEFAULT_CAN_REQUEST_TIMEOUT_MS,
            max_requests_per_iteration: DEFAULT_MAX_REQUESTS_PER_ITERATION,
            min_random_delay_ms: DEFAULT_MIN_RANDOM_DELAY_MS,
            max_random_delay_ms: DEFAULT_MAX_RANDOM_DELAY_MS,
            blacklist_invalid_threshold: DEFAULT_BLACKLIST_INVALID_THRESHOLD,
            blacklist_timeout_threshold: DEFAULT_BLACKLIST_TIMEOUT_THRESHOLD,
            cop_min_divisor: DEFAULT_COP_MIN_DIVISOR,
            app_prefix: DEFAULT_APP_PREFIX.to_string(),
            uid_prefix: DEFAULT_UID_PREFIX.to_string(),
            discovery_prefix: DEFAULT_DISCOVERY_PREFIX.to_string(),
            main_device_id: DEFAULT_MAIN_DEVICE_ID.to_string(),
            main_device_name: DEFAULT_MAIN_DEVICE_NAME.to_string(),
            main_device_model: DEFAULT_MAIN_DEVICE_MODEL.to_string(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            diagnostics_interval_ms: DEFAULT_DIAGNOSTICS_INTERVAL_MS,
            ring_capacity: DEFAULT_RING_CAPACITY,
            requests: Vec::new(),
            mqtt: MqttConfig::default(),
            bus: BusConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Read a JSON configuration file and validate it.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, GatewayError> {
        let json = fs::read_to_string(path)?;
        let config: GatewayConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Configured polling rows, or the built-in table when none are given.
    pub fn request_rows(&self) -> Vec<RequestRow> {
        if self.requests.is_empty() {
            default_requests()
        } else {
            self.requests.clone()
        }
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.max_requests_per_iteration == 0 {
            return Err(GatewayError::Config(
                "max_requests_per_iteration must be at least 1".into(),
            ));
        }
        if self.min_random_delay_ms > self.max_random_delay_ms {
            return Err(GatewayError::Config(format!(
                "min_random_delay_ms ({}) exceeds max_random_delay_ms ({})",
                self.min_random_delay_ms, self.max_random_delay_ms
            )));
        }
        if self.blacklist_invalid_threshold == 0 || self.blacklist_timeout_threshold == 0 {
            return Err(GatewayError::Config("blacklist thresholds must be at least 1".into()));
        }
        if self.tick_interval_ms == 0 {
            return Err(GatewayError::Config("tick_interval_ms must be positive".into()));
        }
        if self.can_request_timeout_ms == 0 {
            return Err(GatewayError::Config("can_request_timeout_ms must be positive".into()));
        }
        if self.cop_min_divisor.is_nan() || self.cop_min_divisor < 0.0 {
            return Err(GatewayError::Config("cop_min_divisor must be non-negative".into()));
        }

        for row in &self.requests {
            if catalogue::signal_by_name(&row.signal).is_sentinel() {
                return Err(GatewayError::UnknownSignal(row.signal.clone()));
            }
            if row.member != ALL_MEMBERS_NAME && catalogue::member_by_name(&row.member).is_none() {
                return Err(GatewayError::UnknownMember(row.member.clone()));
            }
            if row.frequency_s == 0 {
                return Err(GatewayError::Config(format!(
                    "request {}/{} has zero frequency",
                    row.member, row.signal
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.startup_delay_ms, 30_000);
        assert!(!config.request_rows().is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"max_requests_per_iteration": 2, "bus": {"transport": "socketcan"}}"#)
                .unwrap();
        assert_eq!(config.max_requests_per_iteration, 2);
        assert_eq!(config.bus.transport, Transport::Socketcan);
        assert_eq!(config.bus.interface, "can0");
        assert_eq!(config.can_request_timeout_ms, DEFAULT_CAN_REQUEST_TIMEOUT_MS);
    }

    #[test]
    fn test_rejects_inverted_delay_range() {
        let config = GatewayConfig {
            min_random_delay_ms: 2_000,
            max_random_delay_ms: 1_000,
            ..GatewayConfig::default()
        };
        assert!(matches!(config.validate(), Err(GatewayError::Config(_))));
    }

    #[test]
    fn test_rejects_unknown_rows() {
        let mut config = GatewayConfig::default();
        config.requests = vec![RequestRow::new("NO_SUCH_SIGNAL", 30, "KESSEL")];
        assert!(matches!(config.validate(), Err(GatewayError::UnknownSignal(_))));

        config.requests = vec![RequestRow::new("WPVORLAUFIST", 30, "NOBODY")];
        assert!(matches!(config.validate(), Err(GatewayError::UnknownMember(_))));
    }
}
