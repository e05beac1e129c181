//! Advertise-then-publish state machine over a [`Sink`].
//!
//! Discovery for a UID is sent once per process, right before its first state
//! publication, until it is retracted or [`SinkAdapter::republish`] is called.
//! Retraction publishes an empty retained discovery and an empty retained
//! state; retracting an already retracted UID is a no-op.

use crate::catalogue::{Module, SignalDefinition};
use crate::constants::{AVAILABILITY_OFFLINE, AVAILABILITY_ONLINE};
use crate::derived::CalculatedSensor;
use crate::log_warn_throttled;
use crate::logging::{log_debug, log_info};
use crate::quality::QualityTracker;
use crate::sink::discovery::{calculated_component, component, EntityDescriptor, Naming};
use crate::sink::Sink;
use crate::util::logging::LogThrottle;
use serde_json::json;
use std::collections::{HashMap, HashSet};

pub struct SinkAdapter<S: Sink> {
    sink: S,
    naming: Naming,
    discovered: HashSet<String>,
    retracted: HashSet<String>,
    calculated_discovered: HashSet<&'static str>,
    uid_cache: HashMap<(u16, &'static str), String>,
    throttle: LogThrottle,
    failures: u64,
}

impl<S: Sink> SinkAdapter<S> {
    pub fn new(sink: S, naming: Naming) -> Self {
        SinkAdapter {
            sink,
            naming,
            discovered: HashSet::new(),
            retracted: HashSet::new(),
            calculated_discovered: HashSet::new(),
            uid_cache: HashMap::new(),
            throttle: LogThrottle::new(10_000, 5),
            failures: 0,
        }
    }

    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Publishes the transport refused since creation.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    fn send(&mut self, topic: &str, payload: &str, retained: bool) {
        if let Err(e) = self.sink.publish(topic, payload, retained) {
            self.failures += 1;
            log_warn_throttled!(self.throttle, "Publish to {topic} failed: {e}");
        }
    }

    fn send_descriptor(&mut self, topic: &str, descriptor: &EntityDescriptor) {
        match serde_json::to_string(descriptor) {
            Ok(payload) => self.send(topic, &payload, true),
            Err(e) => log_warn_throttled!(self.throttle, "Cannot serialise descriptor for {topic}: {e}"),
        }
    }

    pub fn uid(&mut self, member: &'static Module, signal: &'static SignalDefinition) -> String {
        let naming = &self.naming;
        self.uid_cache
            .entry((member.address, signal.name))
            .or_insert_with(|| naming.signal_uid(member, signal))
            .clone()
    }

    pub fn is_discovered(&self, uid: &str) -> bool {
        self.discovered.contains(uid) || self.calculated_discovered.contains(uid)
    }

    /// Send discovery for a signal unless it is already advertised.
    pub fn advertise(&mut self, member: &'static Module, signal: &'static SignalDefinition) -> bool {
        let uid = self.uid(member, signal);
        if self.discovered.contains(&uid) {
            return false;
        }
        let topic = self.naming.discovery_topic(component(signal.value_type), &uid);
        let descriptor = self.naming.signal_descriptor(member, signal);
        self.send_descriptor(&topic, &descriptor);
        log_info(&format!("Discovery published for {uid}"));
        self.retracted.remove(&uid);
        self.discovered.insert(uid);
        true
    }

    /// Advertise if needed, then publish the retained state.
    pub fn publish_state(&mut self, member: &'static Module, signal: &'static SignalDefinition, value: &str) {
        self.advertise(member, signal);
        let topic = self.naming.state_topic(member, signal);
        log_debug(&format!("{topic} = {value}"));
        self.send(&topic, value, true);
    }

    /// Remove a signal's entity downstream. Returns `false` if already retracted.
    pub fn retract(&mut self, member: &'static Module, signal: &'static SignalDefinition) -> bool {
        let uid = self.uid(member, signal);
        if self.retracted.contains(&uid) {
            return false;
        }
        let discovery = self.naming.discovery_topic(component(signal.value_type), &uid);
        let state = self.naming.state_topic(member, signal);
        self.send(&discovery, "", true);
        self.send(&state, "", true);
        log_info(&format!("Retracted {uid}"));
        self.discovered.remove(&uid);
        self.retracted.insert(uid);
        true
    }

    /// Forget discovery and retraction of a recovered signal.
    pub fn reset_discovery(&mut self, member: &'static Module, signal: &'static SignalDefinition) {
        let uid = self.uid(member, signal);
        self.discovered.remove(&uid);
        self.retracted.remove(&uid);
    }

    /// Publish a derived value, advertising the sensor first if needed.
    pub fn publish_calculated(&mut self, sensor: &'static CalculatedSensor, value: &str) {
        if self.calculated_discovered.insert(sensor.unique_id) {
            let topic = self
                .naming
                .discovery_topic(calculated_component(sensor), sensor.object_id);
            let descriptor = self.naming.calculated_descriptor(sensor);
            self.send_descriptor(&topic, &descriptor);
            log_info(&format!("Discovery published for calculated sensor {}", sensor.name));
        }
        let topic = self.naming.calculated_state_topic(sensor);
        self.send(&topic, value, true);
    }

    pub fn announce_main_device(&mut self) {
        let topic = self.naming.main_device_topic();
        let descriptor = self.naming.main_device_descriptor();
        self.send_descriptor(&topic, &descriptor);
        log_info(&format!("Main device published: {}", self.naming.main_device_name));
    }

    pub fn publish_availability(&mut self, online: bool) {
        let topic = self.naming.availability_topic();
        let payload = if online { AVAILABILITY_ONLINE } else { AVAILABILITY_OFFLINE };
        self.send(&topic, payload, true);
    }

    /// Counts and key lists of blacklisted, invalid and silent keys.
    pub fn publish_diagnostics(&mut self, quality: &QualityTracker) {
        let groups = [
            ("blacklisted", quality.blacklisted_keys()),
            ("invalid", quality.invalid_keys()),
            ("no_response", quality.no_response_keys()),
        ];
        for (kind, keys) in groups {
            let state = self.naming.diagnostics_topic(kind, "state");
            let attributes = self.naming.diagnostics_topic(kind, "attributes");
            self.send(&state, &keys.len().to_string(), true);
            self.send(&attributes, &json!({ "keys": keys }).to_string(), true);
        }
    }

    /// Forget every discovery and announce the main device again.
    pub fn republish(&mut self) {
        self.discovered.clear();
        self.calculated_discovered.clear();
        self.announce_main_device();
        log_info("Discovery caches cleared; entities re-advertise on next publication");
    }
}
