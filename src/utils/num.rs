//! Numeric conversions shared by the cache and throttle engines.
//!
//! Saturating helpers clamp instead of panicking; metrics and wait-time arithmetic prefer a
//! clamped value over a truncated one.

use std::time::Duration;

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn duration_to_millis_u64(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Seconds as f64 to a `Duration`, treating NaN and negatives as zero.
#[inline]
#[must_use]
pub fn secs_f64_to_duration(secs: f64) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// `base * 2^exponent`, saturating at `Duration::MAX`.
#[inline]
#[must_use]
pub fn exponential_backoff(base: Duration, exponent: u32) -> Duration {
    match 2u32.checked_pow(exponent) {
        Some(factor) => base.checked_mul(factor).unwrap_or(Duration::MAX),
        None => Duration::MAX,
    }
}
