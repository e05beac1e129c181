//! # Rate-Limited Logging
//!
//! A busy CAN bus or a disconnected sink can produce the same warning many
//! times per second. [`LogThrottle`] caps such messages per time window.
//!
//! ```rust
//! use elster_rs::util::logging::LogThrottle;
//!
//! let mut throttle = LogThrottle::new(1000, 5); // 5 messages per second
//! if throttle.allow() {
//!     log::warn!("sink publish failed");
//! }
//! ```

use std::time::Instant;

/// Throttling structure for rate-limiting log messages
#[derive(Debug)]
pub struct LogThrottle {
    /// Time window for throttling (in milliseconds)
    window_ms: u64,
    /// Maximum messages allowed per window
    cap: u32,
    count: u32,
    t0: Instant,
    suppressed: u64,
}

impl LogThrottle {
    /// Create new throttle with time window and message cap
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            t0: Instant::now(),
            suppressed: 0,
        }
    }

    /// Check if logging is allowed (resets counter after window expires)
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.t0).as_millis() as u64;

        if elapsed_ms > self.window_ms {
            self.t0 = now;
            self.count = 0;
        }

        self.count = self.count.saturating_add(1);
        let allowed = self.count <= self.cap;
        if !allowed {
            self.suppressed += 1;
        }
        allowed
    }

    /// Messages swallowed since creation
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

/// Log a CAN frame in hex at debug level
pub fn log_frame_hex(prefix: &str, id: u16, data: &[u8]) {
    if log::log_enabled!(log::Level::Debug) {
        log::debug!(
            target: "elster::frame",
            "{prefix}: id=0x{id:03X} data={}",
            crate::util::hex::format_hex_compact(data)
        );
    }
}

/// Log a warning with throttling
#[macro_export]
macro_rules! log_warn_throttled {
    ($throttle:expr, $($arg:tt)*) => {
        if $throttle.allow() {
            log::warn!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_throttle_basic() {
        let mut throttle = LogThrottle::new(1000, 3);

        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(throttle.allow());

        assert!(!throttle.allow());
        assert!(!throttle.allow());
        assert_eq!(throttle.suppressed(), 2);
    }

    #[test]
    fn test_log_frame_hex_does_not_panic() {
        log_frame_hex("rx", 0x180, &[0xA2, 0x00, 0x0C]);
    }
}
