//! Instant arithmetic helpers.

use chrono::{DateTime, TimeZone, Utc};

/// Round `instant` up to the next boundary of `granularity_minutes` (measured
/// from the Unix epoch, which coincides with clock quarters/halves for the
/// usual granularities). An instant already on a boundary is returned as-is.
pub fn ceil_to_granularity(instant: DateTime<Utc>, granularity_minutes: u32) -> DateTime<Utc> {
    let step = i64::from(granularity_minutes.max(1)) * 60;
    let ts = instant.timestamp();
    let rem = ts.rem_euclid(step);
    let aligned = if rem == 0 && instant.timestamp_subsec_nanos() == 0 {
        ts
    } else {
        ts - rem + step
    };
    match Utc.timestamp_opt(aligned, 0) {
        chrono::LocalResult::Single(t) => t,
        // Unreachable for any in-range timestamp; fall back to the input.
        _ => instant,
    }
}
