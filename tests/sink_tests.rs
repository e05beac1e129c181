//! Advertise/retract behaviour of the sink adapter and topic naming.

use elster_rs::catalogue::{member_by_name, signal_by_name};
use elster_rs::derived::COP_HEIZ;
use elster_rs::sink::Naming;
use elster_rs::{GatewayConfig, QualityTracker, RecordingSink, SinkAdapter};
use serde_json::Value;

fn adapter_with(naming: Naming) -> (SinkAdapter<RecordingSink>, RecordingSink) {
    let sink = RecordingSink::new();
    (SinkAdapter::new(sink.clone(), naming), sink)
}

/// Advertise, retract and advertise again after recovery.
#[test]
fn test_retract_then_recover_readvertises() {
    let (mut adapter, sink) = adapter_with(Naming::default());
    let member = member_by_name("MANAGER").unwrap();
    let signal = signal_by_name("AUSSENTEMP");
    let discovery = "homeassistant/sensor/heatingpump/stiebel_manager_aussentemp/config";

    adapter.publish_state(member, signal, "3.5");
    assert!(adapter.retract(member, signal));
    adapter.reset_discovery(member, signal);
    adapter.publish_state(member, signal, "3.6");

    let payloads: Vec<bool> = sink.on_topic(discovery).iter().map(|p| p.payload.is_empty()).collect();
    assert_eq!(payloads, vec![false, true, false]);
    assert!(adapter.is_discovered("stiebel_manager_aussentemp"));
}

/// Retracting a never advertised signal still clears downstream state once.
#[test]
fn test_retract_without_advertise() {
    let (mut adapter, sink) = adapter_with(Naming::default());
    let member = member_by_name("KESSEL").unwrap();
    let signal = signal_by_name("SPEICHERISTTEMP");
    assert!(adapter.retract(member, signal));
    assert!(!adapter.retract(member, signal));
    assert_eq!(sink.published().len(), 2);
}

/// Configured prefixes flow into every topic and UID.
#[test]
fn test_custom_prefixes() {
    let config = GatewayConfig {
        app_prefix: "wp".to_string(),
        uid_prefix: "tecalor".to_string(),
        discovery_prefix: "ha".to_string(),
        ..GatewayConfig::default()
    };
    let (mut adapter, sink) = adapter_with(Naming::from_config(&config));
    let member = member_by_name("HEIZMODUL").unwrap();
    adapter.publish_state(member, signal_by_name("ABTAUUNGAKTIV"), "off");
    adapter.publish_availability(true);

    let topics: Vec<String> = sink.published().into_iter().map(|p| p.topic).collect();
    assert_eq!(
        topics,
        vec![
            "ha/binary_sensor/wp/tecalor_heizmodul_abtauungaktiv/config",
            "wp/HEIZMODUL/ABTAUUNGAKTIV/state",
            "wp/status",
        ]
    );
}

/// Catalogue metadata is used as a whole instead of type defaults.
#[test]
fn test_catalogue_metadata_replaces_type_defaults() {
    let naming = Naming::default();
    let member = member_by_name("MANAGER").unwrap();
    let json: Value =
        serde_json::to_value(naming.signal_descriptor(member, signal_by_name("EVU_SPERRE_AKTIV"))).unwrap();
    assert_eq!(json["name"], "EVU Sperre aktiv");
    assert_eq!(json["icon"], "mdi:power-plug-off");
    assert_eq!(json["payload_on"], "on");
    assert!(json.get("device_class").is_none());

    let json: Value =
        serde_json::to_value(naming.signal_descriptor(member, signal_by_name("DRUCK_HEIZKREIS"))).unwrap();
    assert_eq!(json["unit_of_measurement"], "bar");
    assert_eq!(json["device_class"], "pressure");
}

/// Calculated sensors hang off the main device.
#[test]
fn test_calculated_descriptor_on_main_device() {
    let (mut adapter, sink) = adapter_with(Naming::default());
    adapter.publish_calculated(&COP_HEIZ, "3.10");
    let discovery = sink.on_topic("homeassistant/sensor/heatingpump/cop_heiz/config");
    let json: Value = serde_json::from_str(&discovery[0].payload).unwrap();
    assert_eq!(json["unique_id"], "stiebel_cop_heiz");
    assert_eq!(json["state_topic"], "heatingpump/calculated/cop_heiz/state");
    assert_eq!(json["device"]["identifiers"][0], "stiebel_eltron_wpl13e");
    assert!(json.get("availability_topic").is_none());
}

/// Republishing re-advertises signal and calculated entities.
#[test]
fn test_republish_clears_caches() {
    let (mut adapter, sink) = adapter_with(Naming::default());
    let member = member_by_name("KESSEL").unwrap();
    let signal = signal_by_name("SPEICHERISTTEMP");
    adapter.publish_state(member, signal, "48.0");
    adapter.publish_calculated(&COP_HEIZ, "3.10");
    adapter.republish();
    adapter.publish_state(member, signal, "48.1");
    adapter.publish_calculated(&COP_HEIZ, "3.11");

    assert_eq!(
        sink.on_topic("homeassistant/sensor/heatingpump/stiebel_kessel_speicheristtemp/config").len(),
        2
    );
    assert_eq!(sink.on_topic("homeassistant/sensor/heatingpump/cop_heiz/config").len(), 2);
    assert_eq!(sink.on_topic("homeassistant/sensor/heatingpump/main_device/config").len(), 1);
}

/// Diagnostics carry counts and sorted key lists.
#[test]
fn test_diagnostics_lists_sorted_keys() {
    let (mut adapter, sink) = adapter_with(Naming::default());
    let mut quality = QualityTracker::new(5, 1);
    quality.on_timeout("MANAGER_AUSSENTEMP");
    quality.on_invalid("KESSEL_SPEICHERISTTEMP");
    quality.on_timeout("KESSEL_AUSSENTEMP");
    adapter.publish_diagnostics(&quality);

    let attributes = sink.on_topic("heatingpump/diagnostics/no_response/attributes");
    assert_eq!(
        attributes[0].payload,
        r#"{"keys":["KESSEL_AUSSENTEMP","MANAGER_AUSSENTEMP"]}"#
    );
    assert_eq!(sink.on_topic("heatingpump/diagnostics/blacklisted/state")[0].payload, "2");
    assert_eq!(sink.on_topic("heatingpump/diagnostics/invalid/state")[0].payload, "1");
}
