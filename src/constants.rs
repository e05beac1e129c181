//! Elster Protocol and Gateway Constants
//!
//! This module defines constants used by the Elster-over-CAN codec and the
//! default tuning of the gateway control loop, taken from the WPL 13 E firmware
//! setup.

// ----------------------------------------------------------------------------
// Wire format
// ----------------------------------------------------------------------------

/// Number of data bytes in every Elster CAN frame
pub const ELSTER_FRAME_LEN: usize = 7;

/// Marker in byte 2 announcing a two-byte extended index
pub const ELSTER_EXTENDED_ESCAPE: u8 = 0xFA;

/// Indices at or above this value need the extended envelope
pub const ELSTER_EXTENDED_INDEX_MIN: u16 = 0x0100;

/// Bit set in the prefix byte of a read request
pub const ELSTER_READ_FLAG: u8 = 0x01;

/// Low nibble of the prefix byte in a reply
pub const ELSTER_RESPONSE_FLAG: u8 = 0x02;

/// Mask applied to `address >> 3` to obtain the endpoint nibble
pub const ELSTER_ADDRESS_NIBBLE_MASK: u8 = 0xF0;

/// Mask for the module sub-index carried in byte 1
pub const ELSTER_SUB_INDEX_MASK: u16 = 0x0007;

/// Highest standard (11-bit) CAN identifier
pub const CAN_STANDARD_ID_MAX: u16 = 0x07FF;

/// Source address of every frame the gateway emits (the PC module)
pub const PC_ADDRESS: u16 = 0x680;

/// Raw value the firmware uses for "not available"
pub const RAW_NOT_AVAILABLE: u16 = 0x8000;

/// Decoded text of [`RAW_NOT_AVAILABLE`]
pub const NOT_AVAILABLE_TEXT: &str = "-255";

/// Raw value of an unused time domain
pub const RAW_TIME_DOMAIN_UNUSED: u16 = 0x8080;

/// Index of the catalogue sentinel entry
pub const SENTINEL_INDEX: u16 = 0xFFFF;

// ----------------------------------------------------------------------------
// Request frequencies (seconds)
// ----------------------------------------------------------------------------

pub const FREQ_10S: u32 = 10;
pub const FREQ_30S: u32 = 30;
pub const FREQ_1MIN: u32 = 60;
pub const FREQ_5MIN: u32 = 300;
pub const FREQ_10MIN: u32 = 600;
pub const FREQ_30MIN: u32 = 1800;
pub const FREQ_60MIN: u32 = 3600;

// ----------------------------------------------------------------------------
// Control loop defaults
// ----------------------------------------------------------------------------

/// Delay before the first request is sent (lets the sink connect)
pub const DEFAULT_STARTUP_DELAY_MS: u64 = 30_000;

/// Time after which an unanswered request counts as no-response
pub const DEFAULT_CAN_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Requests emitted per scheduler tick at most
pub const DEFAULT_MAX_REQUESTS_PER_ITERATION: usize = 5;

/// Lower bound of the derived-timer re-arm jitter
pub const DEFAULT_MIN_RANDOM_DELAY_MS: u64 = 200;

/// Upper bound of the derived-timer re-arm jitter
pub const DEFAULT_MAX_RANDOM_DELAY_MS: u64 = 1_000;

/// Consecutive invalid replies before a key is blacklisted
pub const DEFAULT_BLACKLIST_INVALID_THRESHOLD: u16 = 10;

/// Consecutive timeouts before a key is blacklisted
pub const DEFAULT_BLACKLIST_TIMEOUT_THRESHOLD: u16 = 10;

/// Window over which the per-tick request budget also applies
pub const BURST_WINDOW_MS: u64 = 100;

/// Scheduler jitter floor
pub const MIN_SCHEDULE_JITTER_MS: u64 = 500;

/// Capacity of the inbound frame ring
pub const DEFAULT_RING_CAPACITY: usize = 256;

/// Main loop period of the binary
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 20;

/// Period of the diagnostics publication
pub const DEFAULT_DIAGNOSTICS_INTERVAL_MS: u64 = 60_000;

// ----------------------------------------------------------------------------
// Derived signals
// ----------------------------------------------------------------------------

/// Denominators below this skip the COP ratio
pub const DEFAULT_COP_MIN_DIVISOR: f64 = 0.001;

/// Decimal places of published COP ratios
pub const COP_DECIMAL_PLACES: usize = 2;

/// Compressor levels above this count as running
pub const COMPRESSOR_ACTIVE_LEVEL: f64 = 2.0;

/// Temperatures below this are treated as a missing sensor for delta T
pub const DELTA_T_MIN_TEMPERATURE: f64 = -50.0;

pub const DELTA_T_PERIOD_MS: u64 = 30_000;
pub const COMPRESSOR_PERIOD_MS: u64 = 30_000;
pub const DATETIME_PERIOD_MS: u64 = 60_000;

// ----------------------------------------------------------------------------
// Value quality
// ----------------------------------------------------------------------------

/// Numeric values the firmware emits in place of a reading
pub const INVALID_SENTINELS: [f64; 7] = [-255.0, -32768.0, 32767.0, 327.67, -327.67, 327.68, -327.68];

/// Textual values the firmware emits in place of a reading
pub const INVALID_TEXTS: [&str; 4] = ["SNA", "---", "N/A", ""];

pub const INVALID_VALUE_MIN: f64 = -300.0;
pub const INVALID_VALUE_MAX: f64 = 1000.0;

/// Distance to a sentinel that still counts as the sentinel
pub const INVALID_VALUE_EPSILON: f64 = 0.01;

// ----------------------------------------------------------------------------
// Sink naming
// ----------------------------------------------------------------------------

pub const DEFAULT_APP_PREFIX: &str = "heatingpump";
pub const DEFAULT_UID_PREFIX: &str = "stiebel";
pub const DEFAULT_DISCOVERY_PREFIX: &str = "homeassistant";
pub const DEFAULT_MAIN_DEVICE_ID: &str = "stiebel_eltron_wpl13e";
pub const DEFAULT_MAIN_DEVICE_NAME: &str = "Stiebel Eltron Wärmepumpe";
pub const DEFAULT_MAIN_DEVICE_MODEL: &str = "WPL 13 E";
pub const MANUFACTURER: &str = "Stiebel Eltron";

pub const PAYLOAD_ON: &str = "on";
pub const PAYLOAD_OFF: &str = "off";
pub const AVAILABILITY_ONLINE: &str = "online";
pub const AVAILABILITY_OFFLINE: &str = "offline";
