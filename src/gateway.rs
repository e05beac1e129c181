//! # Gateway Control Loop
//!
//! [`Gateway`] owns every piece of mutable state: the scheduler, the quality
//! tracker, the derived engine and the sink adapter. One call to
//! [`Gateway::poll`] is one iteration of the control loop:
//!
//! 1. Drain the ingress ring: decode, check quality, dispatch.
//! 2. Send the requests the scheduler picks for this tick.
//! 3. Publish due derived sensors.
//! 4. Sweep timed-out requests into the no-response streaks.
//!
//! Nothing in `poll` blocks. Until the startup delay has passed the gateway
//! neither sends nor processes frames; when it ends, the main device and
//! availability are announced and polling starts.

use crate::bus::{CanBus, CanFrame, FrameRing};
use crate::catalogue::{self, Module, SignalDefinition};
use crate::clock::Clock;
use crate::config::GatewayConfig;
use crate::constants::PC_ADDRESS;
use crate::derived::{DerivedEngine, DerivedOutput};
use crate::elster::frame::parse_frame;
use crate::error::GatewayError;
use crate::log_warn_throttled;
use crate::logging::{log_debug, log_info, log_warn};
use crate::quality::{is_invalid_value, QualityTracker, Transition};
use crate::scheduler::{entry_key, Request, Scheduler, SchedulerSettings};
use crate::sink::{Naming, Sink, SinkAdapter};
use crate::util::logging::{log_frame_hex, LogThrottle};
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Counters since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    pub frames_received: u64,
    pub frames_ignored: u64,
    pub values_published: u64,
    pub values_invalid: u64,
    pub requests_sent: u64,
    pub send_failures: u64,
    pub timeouts: u64,
}

pub struct Gateway<B: CanBus, S: Sink, C: Clock> {
    config: GatewayConfig,
    bus: B,
    ring: FrameRing,
    clock: C,
    rng: StdRng,
    scheduler: Scheduler,
    quality: QualityTracker,
    derived: DerivedEngine,
    sink: SinkAdapter<S>,
    created_ms: u64,
    running: bool,
    next_diagnostics_ms: u64,
    seen_dropped: u64,
    throttle: LogThrottle,
    stats: GatewayStats,
}

impl<B: CanBus, S: Sink, C: Clock> Gateway<B, S, C> {
    /// Create a gateway seeded from system entropy.
    pub fn new(config: GatewayConfig, bus: B, sink: S, clock: C) -> Result<Self, GatewayError> {
        Self::with_rng(config, bus, sink, clock, StdRng::from_entropy())
    }

    /// Create a gateway with an explicit random source.
    pub fn with_rng(config: GatewayConfig, bus: B, sink: S, clock: C, rng: StdRng) -> Result<Self, GatewayError> {
        config.validate()?;

        let scheduler = Scheduler::new(
            &config.request_rows(),
            SchedulerSettings {
                max_requests_per_iteration: config.max_requests_per_iteration,
                request_timeout_ms: config.can_request_timeout_ms,
            },
        );
        let quality = QualityTracker::new(
            config.blacklist_invalid_threshold,
            config.blacklist_timeout_threshold,
        );
        let derived = DerivedEngine::new(
            config.cop_min_divisor,
            config.min_random_delay_ms,
            config.max_random_delay_ms,
        );
        let sink = SinkAdapter::new(sink, Naming::from_config(&config));
        let ring = FrameRing::new(config.ring_capacity);
        let created_ms = clock.now_ms();

        log_info(&format!(
            "Gateway created with {} scheduled requests, polling starts in {} ms",
            scheduler.len(),
            config.startup_delay_ms
        ));

        Ok(Gateway {
            config,
            bus,
            ring,
            clock,
            rng,
            scheduler,
            quality,
            derived,
            sink,
            created_ms,
            running: false,
            next_diagnostics_ms: 0,
            seen_dropped: 0,
            throttle: LogThrottle::new(10_000, 5),
            stats: GatewayStats::default(),
        })
    }

    /// Producer handle of the ingress ring for the transport's reader.
    pub fn ring(&self) -> FrameRing {
        self.ring.clone()
    }

    /// One iteration of the control loop.
    pub fn poll(&mut self) {
        let now = self.clock.now_ms();

        if !self.running {
            if now.saturating_sub(self.created_ms) < self.config.startup_delay_ms {
                self.discard_ingress();
                return;
            }
            self.begin(now);
        }

        self.drain_ingress();
        self.send_requests(now);

        let outputs = self.derived.tick(now, &mut self.rng);
        self.publish_derived(outputs);

        self.sweep_timeouts(now);

        if now >= self.next_diagnostics_ms {
            self.sink.publish_diagnostics(&self.quality);
            self.next_diagnostics_ms = now + self.config.diagnostics_interval_ms;
        }
    }

    fn begin(&mut self, now: u64) {
        self.running = true;
        self.scheduler.start(now, &mut self.rng);
        self.derived.start(now, &mut self.rng);
        self.sink.announce_main_device();
        self.sink.publish_availability(true);
        self.next_diagnostics_ms = now + self.config.diagnostics_interval_ms;
        log_info("Startup delay elapsed, polling started");
    }

    fn discard_ingress(&mut self) {
        while self.ring.pop().is_some() {
            self.stats.frames_ignored += 1;
        }
    }

    fn drain_ingress(&mut self) {
        let dropped = self.ring.dropped();
        if dropped > self.seen_dropped {
            log_warn_throttled!(
                self.throttle,
                "Ingress ring overflowed, {} frames lost so far",
                dropped
            );
            self.seen_dropped = dropped;
        }
        while let Some(frame) = self.ring.pop() {
            self.process_frame(&frame);
        }
    }

    /// Decode one received frame and route its value.
    pub fn process_frame(&mut self, frame: &CanFrame) {
        self.stats.frames_received += 1;
        log_frame_hex("rx", frame.id, frame.data());

        if frame.id == PC_ADDRESS {
            self.stats.frames_ignored += 1;
            return;
        }
        let elster = match parse_frame(frame.id, frame.data()) {
            Ok(elster) => elster,
            Err(e) => {
                log_warn_throttled!(self.throttle, "Dropping frame from 0x{:03X}: {}", frame.id, e);
                self.stats.frames_ignored += 1;
                return;
            }
        };
        if elster.is_read_request() {
            self.stats.frames_ignored += 1;
            return;
        }

        let member = catalogue::member_by_address(frame.id);
        let signal = catalogue::signal_by_index(elster.index);
        if member.is_unknown() || signal.is_sentinel() || signal.blacklisted {
            self.stats.frames_ignored += 1;
            return;
        }

        let key = entry_key(member, signal);
        self.scheduler.mark_replied(&key);

        let value = signal.decode_raw(elster.raw);
        log_debug(&format!("{key} = {value}"));

        if is_invalid_value(&value, signal.value_type) {
            self.stats.values_invalid += 1;
            if self.quality.on_invalid(&key) == Transition::Blacklisted {
                self.on_blacklisted(member, signal, &key);
            }
            return;
        }

        if self.quality.on_valid(&key) == Transition::Recovered {
            log_info(&format!("{key} recovered, lifting blacklist"));
            self.sink.reset_discovery(member, signal);
            self.sink.publish_diagnostics(&self.quality);
        }
        self.dispatch(member, signal, &value);
    }

    fn dispatch(&mut self, member: &'static Module, signal: &'static SignalDefinition, value: &str) {
        self.sink.publish_state(member, signal, value);
        self.stats.values_published += 1;
        let outputs = self.derived.on_signal(signal.name, value);
        self.publish_derived(outputs);
    }

    fn publish_derived(&mut self, outputs: Vec<DerivedOutput>) {
        for output in outputs {
            self.sink.publish_calculated(output.sensor, &output.value);
        }
    }

    fn on_blacklisted(&mut self, member: &'static Module, signal: &'static SignalDefinition, key: &str) {
        let state = self.quality.state(key);
        log_info(&format!(
            "Blacklisting {key} (invalid streak {}, no-response streak {})",
            state.invalid_streak, state.no_response_streak
        ));
        self.sink.retract(member, signal);
        self.sink.publish_diagnostics(&self.quality);
    }

    fn send_requests(&mut self, now: u64) {
        let requests = self.scheduler.tick(now, &self.quality, &mut self.rng);
        for request in requests {
            let data = request.frame_data();
            let frame = match CanFrame::new(PC_ADDRESS, &data) {
                Ok(frame) => frame,
                Err(e) => {
                    log_warn(&format!("Cannot build frame for {}: {e}", request.key()));
                    continue;
                }
            };
            log_frame_hex("tx", frame.id, frame.data());
            match self.bus.send_frame(&frame) {
                Ok(()) => self.stats.requests_sent += 1,
                Err(e) => {
                    self.stats.send_failures += 1;
                    log_warn_throttled!(self.throttle, "Send of {} failed: {}", request.key(), e);
                }
            }
        }
    }

    fn sweep_timeouts(&mut self, now: u64) {
        for key in self.scheduler.sweep_timeouts(now) {
            self.stats.timeouts += 1;
            log_debug(&format!("No response for {key}"));
            if self.quality.on_timeout(&key) == Transition::Blacklisted {
                if let Some((member, signal)) = self.scheduler.entry(&key).map(|e| (e.member, e.signal)) {
                    self.on_blacklisted(member, signal, &key);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Host operations
    // ------------------------------------------------------------------

    /// Resolve a host request; refuses permanently and dynamically blacklisted keys.
    fn resolve(
        &self,
        member: &str,
        signal: &str,
    ) -> Result<(&'static Module, &'static SignalDefinition), GatewayError> {
        let (module, definition) = catalogue::resolve(member, signal)?;
        if definition.blacklisted {
            return Err(GatewayError::Blacklisted(signal.to_string()));
        }
        let key = entry_key(module, definition);
        if self.quality.is_blacklisted(&key) {
            return Err(GatewayError::Blacklisted(key));
        }
        Ok((module, definition))
    }

    /// Encode every `(signal, text)` pair, then queue a write and a read-back each.
    fn queue_writes(&mut self, member: &str, writes: &[(&str, &str)]) -> Result<(), GatewayError> {
        let mut requests = Vec::with_capacity(writes.len() * 2);
        for (signal, text) in writes {
            let (module, definition) = self.resolve(member, signal)?;
            let raw = definition.encode_text(text)?;
            requests.push(Request::write(module, definition, raw));
            requests.push(Request::read(module, definition));
        }
        for request in requests {
            self.scheduler.enqueue(request);
        }
        Ok(())
    }

    /// Queue a read of any signal from any module.
    pub fn read_signal(&mut self, member: &str, signal: &str) -> Result<(), GatewayError> {
        let (module, definition) = self.resolve(member, signal)?;
        self.scheduler.enqueue(Request::read(module, definition));
        Ok(())
    }

    /// Queue a write of `text` followed by a read-back.
    pub fn write_signal(&mut self, member: &str, signal: &str, text: &str) -> Result<(), GatewayError> {
        self.queue_writes(member, &[(signal, text)])
    }

    /// Set the module clock from `HH:MM:SS`.
    pub fn update_time(&mut self, member: &str, time: &str) -> Result<(), GatewayError> {
        let invalid = || GatewayError::Encode {
            signal: "STUNDE/MINUTE/SEKUNDE".to_string(),
            input: time.to_string(),
        };
        let parts: Vec<&str> = time.split(':').collect();
        let [hour, minute, second] = parts[..] else {
            return Err(invalid());
        };
        for (part, max) in [(hour, 23u8), (minute, 59), (second, 59)] {
            match part.parse::<u8>() {
                Ok(v) if v <= max && part.chars().all(|c| c.is_ascii_digit()) => {}
                _ => return Err(invalid()),
            }
        }
        self.queue_writes(
            member,
            &[("STUNDE", hour), ("MINUTE", minute), ("SEKUNDE", second)],
        )
    }

    /// Set the module date from `YYYY-MM-DD`; the year is sent as two digits.
    pub fn update_date(&mut self, member: &str, date: &str) -> Result<(), GatewayError> {
        let invalid = || GatewayError::Encode {
            signal: "JAHR/MONAT/TAG".to_string(),
            input: date.to_string(),
        };
        if date.len() != 10 {
            return Err(invalid());
        }
        let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
        let year = parsed.year().rem_euclid(100).to_string();
        let month = parsed.month().to_string();
        let day = parsed.day().to_string();
        self.queue_writes(
            member,
            &[("JAHR", &year), ("MONAT", &month), ("TAG", &day)],
        )
    }

    /// Queue a read of the device identification.
    pub fn identify_members(&mut self) -> Result<(), GatewayError> {
        self.read_signal("HEIZMODUL", "GERAETE_ID")
    }

    /// Re-advertise every entity on its next publication.
    pub fn republish_discoveries(&mut self) {
        self.sink.republish();
    }

    /// Announce `offline` before shutting down.
    pub fn shutdown(&mut self) {
        self.sink.publish_availability(false);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn quality(&self) -> &QualityTracker {
        &self.quality
    }

    pub fn derived(&self) -> &DerivedEngine {
        &self.derived
    }

    pub fn sink(&self) -> &SinkAdapter<S> {
        &self.sink
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn stats(&self) -> GatewayStats {
        self.stats
    }
}
