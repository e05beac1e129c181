//! # Home Assistant Discovery
//!
//! Topic layout and discovery descriptors:
//!
//! ```text
//! <discovery>/<component>/<app>/<uid>/config    descriptor JSON, retained
//! <app>/<MEMBER>/<SIGNAL>/state                 value, retained
//! <app>/calculated/<name>/state                 derived value, retained
//! <app>/status                                  online / offline
//! <app>/diagnostics/<kind>/{state,attributes}   quality counters
//! ```
//!
//! Each module becomes a device (`stiebel_<MEMBER>`) hanging off one main device
//! via `via_device`. Calculated sensors belong to the main device directly.

use crate::catalogue::{Module, SignalDefinition};
use crate::config::GatewayConfig;
use crate::constants::{MANUFACTURER, PAYLOAD_OFF, PAYLOAD_ON};
use crate::derived::CalculatedSensor;
use crate::elster::value::ValueType;
use serde::Serialize;

/// Discovery metadata a value type implies when the catalogue gives none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDefaults {
    pub device_class: &'static str,
    pub unit: &'static str,
    pub state_class: &'static str,
    pub icon: &'static str,
}

pub fn type_defaults(value_type: ValueType) -> TypeDefaults {
    let (device_class, unit, state_class, icon) = match value_type {
        ValueType::DecVal | ValueType::CentVal | ValueType::MilVal => {
            ("temperature", "°C", "measurement", "mdi:thermometer")
        }
        ValueType::Bool | ValueType::LittleBool => ("", "", "", "mdi:electric-switch"),
        ValueType::Byte | ValueType::LittleEndian => ("", "", "measurement", "mdi:counter"),
        ValueType::ErrNr => ("", "", "", "mdi:alert-circle"),
        ValueType::DevId | ValueType::DevNr => ("", "", "", "mdi:identifier"),
        ValueType::Betriebsart => ("enum", "", "", "mdi:hvac"),
        ValueType::Zeit => ("timestamp", "", "", "mdi:clock"),
        ValueType::Datum => ("date", "", "", "mdi:calendar"),
        _ => ("", "", "", "mdi:gauge"),
    };
    TypeDefaults {
        device_class,
        unit,
        state_class,
        icon,
    }
}

pub fn component(value_type: ValueType) -> &'static str {
    if value_type.is_binary() {
        "binary_sensor"
    } else {
        "sensor"
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceDescriptor {
    pub identifiers: Vec<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub manufacturer: String,
}

/// Body of a discovery `config` message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDescriptor {
    pub name: String,
    pub unique_id: String,
    pub state_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub device: DeviceDescriptor,
}

/// Prefixes and identities shared by all topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub app_prefix: String,
    pub uid_prefix: String,
    pub discovery_prefix: String,
    pub main_device_id: String,
    pub main_device_name: String,
    pub main_device_model: String,
}

impl Naming {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Naming {
            app_prefix: config.app_prefix.clone(),
            uid_prefix: config.uid_prefix.clone(),
            discovery_prefix: config.discovery_prefix.clone(),
            main_device_id: config.main_device_id.clone(),
            main_device_name: config.main_device_name.clone(),
            main_device_model: config.main_device_model.clone(),
        }
    }

    /// Lowercase `<uid_prefix>_<member>_<signal>`, spaces as underscores.
    pub fn signal_uid(&self, member: &Module, signal: &SignalDefinition) -> String {
        format!("{}_{}_{}", self.uid_prefix, member.name, signal.name)
            .to_lowercase()
            .replace(' ', "_")
    }

    pub fn discovery_topic(&self, component: &str, object_id: &str) -> String {
        format!(
            "{}/{}/{}/{}/config",
            self.discovery_prefix, component, self.app_prefix, object_id
        )
    }

    pub fn state_topic(&self, member: &Module, signal: &SignalDefinition) -> String {
        format!("{}/{}/{}/state", self.app_prefix, member.name, signal.name)
    }

    pub fn calculated_state_topic(&self, sensor: &CalculatedSensor) -> String {
        format!("{}/calculated/{}/state", self.app_prefix, sensor.key)
    }

    pub fn availability_topic(&self) -> String {
        format!("{}/status", self.app_prefix)
    }

    pub fn diagnostics_topic(&self, kind: &str, leaf: &str) -> String {
        format!("{}/diagnostics/{}/{}", self.app_prefix, kind, leaf)
    }

    pub fn main_device_topic(&self) -> String {
        self.discovery_topic("sensor", "main_device")
    }

    fn module_device(&self, member: &Module) -> DeviceDescriptor {
        DeviceDescriptor {
            identifiers: vec![format!("{}_{}", self.uid_prefix, member.name)],
            name: member.friendly_name().to_string(),
            via_device: Some(self.main_device_id.clone()),
            model: None,
            manufacturer: MANUFACTURER.to_string(),
        }
    }

    fn main_device(&self, with_model: bool) -> DeviceDescriptor {
        DeviceDescriptor {
            identifiers: vec![self.main_device_id.clone()],
            name: self.main_device_name.clone(),
            via_device: None,
            model: with_model.then(|| self.main_device_model.clone()),
            manufacturer: MANUFACTURER.to_string(),
        }
    }

    /// Descriptor of a bus signal, from its metadata or its type defaults.
    pub fn signal_descriptor(&self, member: &Module, signal: &SignalDefinition) -> EntityDescriptor {
        let value_type = signal.value_type;
        let (device_class, unit, state_class, icon) = match signal.meta {
            Some(meta) if meta.has_sink_fields() => (meta.device_class, meta.unit, meta.state_class, meta.icon),
            _ => {
                let d = type_defaults(value_type);
                (d.device_class, d.unit, d.state_class, d.icon)
            }
        };

        let (payload_on, payload_off) = if value_type.is_binary() {
            let meta = signal.meta.unwrap_or(crate::catalogue::SignalMeta::EMPTY);
            let on = if meta.payload_on.is_empty() { PAYLOAD_ON } else { meta.payload_on };
            let off = if meta.payload_off.is_empty() { PAYLOAD_OFF } else { meta.payload_off };
            (Some(on.to_string()), Some(off.to_string()))
        } else {
            (None, None)
        };

        EntityDescriptor {
            name: signal.friendly_name().to_string(),
            unique_id: self.signal_uid(member, signal),
            state_topic: self.state_topic(member, signal),
            availability_topic: Some(self.availability_topic()),
            payload_on,
            payload_off,
            device_class: non_empty(device_class),
            unit_of_measurement: non_empty(unit),
            state_class: if value_type.has_state_class() {
                non_empty(state_class)
            } else {
                None
            },
            icon: non_empty(icon),
            device: self.module_device(member),
        }
    }

    pub fn calculated_descriptor(&self, sensor: &CalculatedSensor) -> EntityDescriptor {
        EntityDescriptor {
            name: sensor.name.to_string(),
            unique_id: sensor.unique_id.to_string(),
            state_topic: self.calculated_state_topic(sensor),
            availability_topic: None,
            payload_on: sensor.binary.then(|| PAYLOAD_ON.to_string()),
            payload_off: sensor.binary.then(|| PAYLOAD_OFF.to_string()),
            device_class: non_empty(sensor.device_class),
            unit_of_measurement: non_empty(sensor.unit),
            state_class: non_empty(sensor.state_class),
            icon: non_empty(sensor.icon),
            device: self.main_device(false),
        }
    }

    /// Status entity registering the main device.
    pub fn main_device_descriptor(&self) -> EntityDescriptor {
        EntityDescriptor {
            name: "Wärmepumpe Status".to_string(),
            unique_id: format!("{}_status", self.main_device_id),
            state_topic: self.availability_topic(),
            availability_topic: None,
            payload_on: None,
            payload_off: None,
            device_class: None,
            unit_of_measurement: None,
            state_class: None,
            icon: Some("mdi:heat-pump".to_string()),
            device: self.main_device(true),
        }
    }
}

impl Default for Naming {
    fn default() -> Self {
        Naming::from_config(&GatewayConfig::default())
    }
}

pub fn calculated_component(sensor: &CalculatedSensor) -> &'static str {
    if sensor.binary {
        "binary_sensor"
    } else {
        "sensor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{member_by_name, signal_by_name};
    use crate::derived::{COMPRESSOR_ACTIVE, COP_WW};
    use serde_json::Value;

    #[test]
    fn test_signal_descriptor_from_type_defaults() {
        let naming = Naming::default();
        let member = member_by_name("KESSEL").unwrap();
        let signal = signal_by_name("WPVORLAUFIST");
        let json: Value = serde_json::to_value(naming.signal_descriptor(member, signal)).unwrap();

        assert_eq!(json["unique_id"], "stiebel_kessel_wpvorlaufist");
        assert_eq!(json["name"], "WP Vorlauf Isttemperatur");
        assert_eq!(json["state_topic"], "heatingpump/KESSEL/WPVORLAUFIST/state");
        assert_eq!(json["availability_topic"], "heatingpump/status");
        assert_eq!(json["device_class"], "temperature");
        assert_eq!(json["unit_of_measurement"], "°C");
        assert_eq!(json["state_class"], "measurement");
        assert_eq!(json["device"]["identifiers"][0], "stiebel_KESSEL");
        assert_eq!(json["device"]["name"], "Kessel");
        assert_eq!(json["device"]["via_device"], "stiebel_eltron_wpl13e");
        assert!(json.get("payload_on").is_none());
    }

    #[test]
    fn test_binary_descriptor_has_payloads() {
        let naming = Naming::default();
        let member = member_by_name("HEIZMODUL").unwrap();
        let signal = signal_by_name("ABTAUUNGAKTIV");
        assert_eq!(component(signal.value_type), "binary_sensor");
        let json: Value = serde_json::to_value(naming.signal_descriptor(member, signal)).unwrap();
        assert_eq!(json["payload_on"], "on");
        assert_eq!(json["payload_off"], "off");
        assert!(json.get("state_class").is_none());
        assert!(json.get("device_class").is_none());
    }

    #[test]
    fn test_state_class_only_for_numeric_types() {
        let naming = Naming::default();
        let member = member_by_name("HEIZMODUL").unwrap();
        // VERDICHTER is a plain integer; its catalogue state class is dropped.
        let json: Value =
            serde_json::to_value(naming.signal_descriptor(member, signal_by_name("VERDICHTER"))).unwrap();
        assert!(json.get("state_class").is_none());
        assert_eq!(json["icon"], "mdi:engine");
    }

    #[test]
    fn test_calculated_topics() {
        let naming = Naming::default();
        assert_eq!(
            naming.discovery_topic(calculated_component(&COP_WW), COP_WW.object_id),
            "homeassistant/sensor/heatingpump/cop_ww/config"
        );
        assert_eq!(
            naming.discovery_topic(calculated_component(&COMPRESSOR_ACTIVE), COMPRESSOR_ACTIVE.object_id),
            "homeassistant/binary_sensor/heatingpump/stiebel_calculated_compressor_active/config"
        );
        assert_eq!(naming.calculated_state_topic(&COP_WW), "heatingpump/calculated/cop_ww/state");
    }

    #[test]
    fn test_main_device_descriptor() {
        let naming = Naming::default();
        assert_eq!(naming.main_device_topic(), "homeassistant/sensor/heatingpump/main_device/config");
        let json: Value = serde_json::to_value(naming.main_device_descriptor()).unwrap();
        assert_eq!(json["unique_id"], "stiebel_eltron_wpl13e_status");
        assert_eq!(json["device"]["model"], "WPL 13 E");
        assert_eq!(json["device"]["manufacturer"], "Stiebel Eltron");
    }
}
