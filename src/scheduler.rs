//! # Request Scheduler
//!
//! Decides which `(member, signal)` pairs to poll on each tick of the control
//! loop.
//!
//! - Each entry is phase-shifted once by `U[0, period]` when polling starts, so
//!   entries sharing a period spread across it instead of bursting together.
//! - After each request an entry is re-armed at `period + U[0, max(period/20, 500)]`.
//! - At most `max_requests_per_iteration` requests leave per tick, and no more
//!   than that within any [`BURST_WINDOW_MS`]. Scanning is round-robin, so
//!   entries late in the table are not starved.
//! - Rows for the `ALL` pseudo-member expand into one entry per main module. At
//!   most one request per such group is emitted per tick.
//! - Entries waiting for a reply are skipped until the request timeout passes.
//!   Dynamically blacklisted entries keep advancing their due time but are never
//!   polled.
//!
//! Host operations enqueue one-off requests which are drained first on the next
//! tick and count against the same budget.

use crate::catalogue::{self, Module, SignalDefinition, ALL_MEMBERS, ALL_MEMBERS_NAME};
use crate::config::RequestRow;
use crate::constants::{BURST_WINDOW_MS, ELSTER_FRAME_LEN, MIN_SCHEDULE_JITTER_MS};
use crate::elster::frame::{read_request, write_request};
use crate::logging::{log_debug, log_warn};
use crate::quality::QualityTracker;
use rand::Rng;
use std::collections::{HashMap, VecDeque};

/// Quality and scheduling key of a `(member, signal)` pair.
pub fn entry_key(member: &Module, signal: &SignalDefinition) -> String {
    format!("{}_{}", member.name, signal.name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Read,
    Write(u16),
}

/// A request ready to be put on the bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request {
    pub member: &'static Module,
    pub signal: &'static SignalDefinition,
    pub action: RequestAction,
}

impl Request {
    pub fn read(member: &'static Module, signal: &'static SignalDefinition) -> Self {
        Request {
            member,
            signal,
            action: RequestAction::Read,
        }
    }

    pub fn write(member: &'static Module, signal: &'static SignalDefinition, raw: u16) -> Self {
        Request {
            member,
            signal,
            action: RequestAction::Write(raw),
        }
    }

    pub fn key(&self) -> String {
        entry_key(self.member, self.signal)
    }

    /// Elster data bytes of this request.
    pub fn frame_data(&self) -> [u8; ELSTER_FRAME_LEN] {
        match self.action {
            RequestAction::Read => read_request(self.member, self.signal),
            RequestAction::Write(raw) => write_request(self.member, self.signal, raw),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledEntry {
    pub key: String,
    pub member: &'static Module,
    pub signal: &'static SignalDefinition,
    pub period_ms: u64,
    pub next_due_ms: u64,
    pub last_request_ms: u64,
    pub in_flight: bool,
    pub pending_since_ms: Option<u64>,
    /// Index of the `ALL` row this entry was expanded from
    pub group: Option<usize>,
}

impl ScheduledEntry {
    fn request_expired(&self, now_ms: u64, timeout_ms: u64) -> bool {
        self.pending_since_ms
            .map_or(true, |since| now_ms.saturating_sub(since) >= timeout_ms)
    }
}

/// Scheduling limits taken from the gateway configuration.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    pub max_requests_per_iteration: usize,
    pub request_timeout_ms: u64,
}

#[derive(Debug)]
pub struct Scheduler {
    entries: Vec<ScheduledEntry>,
    by_key: HashMap<String, usize>,
    settings: SchedulerSettings,
    cursor: usize,
    group_sent: Vec<bool>,
    commands: VecDeque<Request>,
    /// Keys whose stale request was replaced by a new one inside `tick`
    expired: Vec<String>,
    /// Send times inside the current burst window, oldest first
    recent: VecDeque<u64>,
}

impl Scheduler {
    /// Build one entry per resolvable row.
    ///
    /// Rows naming unknown or permanently blacklisted signals, unknown members
    /// or a zero frequency are skipped. Duplicate keys keep the first row.
    pub fn new(rows: &[RequestRow], settings: SchedulerSettings) -> Self {
        let mut scheduler = Scheduler {
            entries: Vec::new(),
            by_key: HashMap::new(),
            settings,
            cursor: 0,
            group_sent: Vec::new(),
            commands: VecDeque::new(),
            expired: Vec::new(),
            recent: VecDeque::new(),
        };

        for row in rows {
            let signal = catalogue::signal_by_name(&row.signal);
            if signal.is_sentinel() {
                log_warn(&format!("Skipping request for unknown signal {}", row.signal));
                continue;
            }
            if signal.blacklisted || row.frequency_s == 0 {
                continue;
            }
            let period_ms = u64::from(row.frequency_s) * 1000;

            if row.member == ALL_MEMBERS_NAME {
                let group = scheduler.group_sent.len();
                scheduler.group_sent.push(false);
                for member in ALL_MEMBERS {
                    scheduler.add_entry(member, signal, period_ms, Some(group));
                }
            } else {
                match catalogue::member_by_name(&row.member) {
                    Some(member) => scheduler.add_entry(member, signal, period_ms, None),
                    None => log_warn(&format!("Skipping request for unknown member {}", row.member)),
                }
            }
        }
        scheduler
    }

    fn add_entry(
        &mut self,
        member: &'static Module,
        signal: &'static SignalDefinition,
        period_ms: u64,
        group: Option<usize>,
    ) {
        let key = entry_key(member, signal);
        if self.by_key.contains_key(&key) {
            return;
        }
        self.by_key.insert(key.clone(), self.entries.len());
        self.entries.push(ScheduledEntry {
            key,
            member,
            signal,
            period_ms,
            next_due_ms: 0,
            last_request_ms: 0,
            in_flight: false,
            pending_since_ms: None,
            group,
        });
    }

    /// Phase-shift every entry inside its first period.
    pub fn start<R: Rng>(&mut self, now_ms: u64, rng: &mut R) {
        for entry in &mut self.entries {
            entry.next_due_ms = now_ms + rng.gen_range(0..=entry.period_ms);
        }
    }

    fn jitter<R: Rng>(period_ms: u64, rng: &mut R) -> u64 {
        let max = (period_ms / 20).max(MIN_SCHEDULE_JITTER_MS);
        rng.gen_range(0..=max)
    }

    /// Queue a one-off request ahead of the scheduled ones.
    pub fn enqueue(&mut self, request: Request) {
        self.commands.push_back(request);
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    /// Requests to send now, at most the per-tick budget.
    pub fn tick<R: Rng>(&mut self, now_ms: u64, quality: &QualityTracker, rng: &mut R) -> Vec<Request> {
        let limit = self.settings.max_requests_per_iteration.max(1);
        while let Some(&sent_at) = self.recent.front() {
            if now_ms.saturating_sub(sent_at) < BURST_WINDOW_MS {
                break;
            }
            self.recent.pop_front();
        }
        let budget = limit.saturating_sub(self.recent.len());
        let mut out = Vec::with_capacity(budget);
        self.group_sent.iter_mut().for_each(|sent| *sent = false);

        while out.len() < budget {
            let Some(request) = self.commands.pop_front() else {
                break;
            };
            if quality.is_blacklisted(&request.key()) {
                log_debug(&format!("Dropping queued request for blacklisted {}", request.key()));
                continue;
            }
            if request.action == RequestAction::Read {
                if let Some(&i) = self.by_key.get(&request.key()) {
                    self.mark_sent(i, now_ms);
                }
            }
            out.push(request);
        }

        let count = self.entries.len();
        if count == 0 || out.len() >= budget {
            self.record_sent(now_ms, out.len());
            return out;
        }

        let start = self.cursor % count;
        let mut last_sent = None;
        for step in 0..count {
            let i = (start + step) % count;
            let timeout_ms = self.settings.request_timeout_ms;
            let entry = &mut self.entries[i];

            if entry.in_flight && !entry.request_expired(now_ms, timeout_ms) {
                continue;
            }
            if now_ms < entry.next_due_ms {
                continue;
            }
            if quality.is_blacklisted(&entry.key) {
                entry.next_due_ms = now_ms + entry.period_ms + Self::jitter(entry.period_ms, rng);
                continue;
            }
            if let Some(group) = entry.group {
                if self.group_sent[group] {
                    continue;
                }
                self.group_sent[group] = true;
            }

            if entry.in_flight {
                self.expired.push(entry.key.clone());
            }
            entry.next_due_ms = now_ms + entry.period_ms + Self::jitter(entry.period_ms, rng);
            out.push(Request::read(entry.member, entry.signal));
            self.mark_sent(i, now_ms);
            last_sent = Some(i);

            if out.len() >= budget {
                break;
            }
        }

        self.cursor = match last_sent {
            Some(i) if out.len() >= budget => (i + 1) % count,
            _ => (start + 1) % count,
        };
        self.record_sent(now_ms, out.len());
        out
    }

    fn record_sent(&mut self, now_ms: u64, sent: usize) {
        self.recent.extend(std::iter::repeat(now_ms).take(sent));
    }

    fn mark_sent(&mut self, i: usize, now_ms: u64) {
        let entry = &mut self.entries[i];
        entry.in_flight = true;
        entry.pending_since_ms = Some(now_ms);
        entry.last_request_ms = now_ms;
    }

    /// Clear the pending request of a key; returns whether one was pending.
    pub fn mark_replied(&mut self, key: &str) -> bool {
        match self.by_key.get(key) {
            Some(&i) => {
                let entry = &mut self.entries[i];
                let was_pending = entry.in_flight;
                entry.in_flight = false;
                entry.pending_since_ms = None;
                was_pending
            }
            None => false,
        }
    }

    /// Clear requests older than the timeout and return their keys.
    pub fn sweep_timeouts(&mut self, now_ms: u64) -> Vec<String> {
        let mut timed_out = std::mem::take(&mut self.expired);
        let timeout_ms = self.settings.request_timeout_ms;
        for entry in &mut self.entries {
            if entry.in_flight && entry.request_expired(now_ms, timeout_ms) {
                entry.in_flight = false;
                entry.pending_since_ms = None;
                timed_out.push(entry.key.clone());
            }
        }
        timed_out
    }

    pub fn entries(&self) -> &[ScheduledEntry] {
        &self.entries
    }

    pub fn entry(&self, key: &str) -> Option<&ScheduledEntry> {
        self.by_key.get(key).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
