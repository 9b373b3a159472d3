//! Wall-clock helpers.
//!
//! Scan uids encode time-of-day, so every timestamp in the pipeline is
//! expressed as seconds since local midnight. Matching spans minutes at
//! most, so the midnight wrap is handled by the operators restarting
//! the line, not by us.

use chrono::Timelike;

/// Seconds since local midnight, sub-second resolution.
pub fn seconds_of_day() -> f64 {
    let now = chrono::Local::now();
    f64::from(now.num_seconds_from_midnight()) + f64::from(now.nanosecond()) * 1e-9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_of_day_in_range() {
        let s = seconds_of_day();
        assert!((0.0..86_400.0).contains(&s));
    }
}
