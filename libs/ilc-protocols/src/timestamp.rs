//! FPGA timestamp conversions.
//!
//! The FPGA counts nanoseconds in a 64-bit register. Frame timestamps on the
//! response stream carry only the low 32 bits.

use chrono::{DateTime, TimeZone, Utc};

const NANOSECONDS_PER_SECOND: f64 = 1_000_000_000.0;

/// Converts a raw nanosecond counter value to seconds.
pub fn raw_to_seconds(raw: u64) -> f64 {
    raw as f64 / NANOSECONDS_PER_SECOND
}

/// Converts seconds back to a raw nanosecond counter value.
pub fn seconds_to_raw(seconds: f64) -> u64 {
    (seconds * NANOSECONDS_PER_SECOND) as u64
}

/// Current wall-clock time as protocol seconds.
pub fn now_seconds() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / NANOSECONDS_PER_SECOND
}

/// Interprets protocol seconds as a UTC instant. Returns `None` when the
/// value falls outside the representable range.
pub fn seconds_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    let secs = seconds.trunc() as i64;
    let nanos = (seconds.fract() * NANOSECONDS_PER_SECOND) as u32;
    Utc.timestamp_opt(secs, nanos).single()
}
