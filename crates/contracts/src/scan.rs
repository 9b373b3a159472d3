//! ScanEvent - barcode gate output
//!
//! A scan carries the parcel uid, the route code printed on the label,
//! and the scan timestamp recovered from the uid itself.

use serde::{Deserialize, Serialize};

/// One barcode scan at the line entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    /// Parcel uid as printed, e.g. `20260130_100000_000`
    pub uid: String,

    /// Route code, e.g. `XSEA`
    pub route_code: String,

    /// Scan time in seconds since midnight
    pub time_s: f64,
}

/// Extract the scan time embedded in a parcel uid.
///
/// Uids embed an `HHMMSS_mmm` block, optionally preceded by a
/// `YYYYMMDD_` date prefix. Returns seconds since midnight, or `None`
/// when no timestamp block is present (callers fall back to the wall
/// clock).
///
/// ```
/// use contracts::parse_uid_seconds;
///
/// assert_eq!(parse_uid_seconds("20260130_100000_000"), Some(36000.0));
/// assert_eq!(parse_uid_seconds("100000_500"), Some(36000.5));
/// assert_eq!(parse_uid_seconds("no-timestamp"), None);
/// ```
pub fn parse_uid_seconds(uid: &str) -> Option<f64> {
    let block = find_time_block(uid)?;
    let (hms, millis) = block.split_once('_')?;

    let hours: f64 = hms[0..2].parse().ok()?;
    let minutes: f64 = hms[2..4].parse().ok()?;
    let seconds: f64 = hms[4..6].parse().ok()?;
    let millis: f64 = millis.parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds + millis / 1000.0)
}

/// Locate the first `HHMMSS_mmm` block, skipping a leading `YYYYMMDD_`
/// date prefix when one sits directly in front of it.
fn find_time_block(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let digit = |i: usize| bytes.get(i).is_some_and(|b| b.is_ascii_digit());

    for start in 0..bytes.len() {
        let mut at = start;
        if (0..8).all(|k| digit(at + k)) && bytes.get(at + 8) == Some(&b'_') {
            at += 9;
        }
        if (0..6).all(|k| digit(at + k)) && bytes.get(at + 6) == Some(&b'_') && digit(at + 7) {
            let mut end = at + 7;
            while digit(end) {
                end += 1;
            }
            return Some(&s[at..end]);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dated_uid() {
        assert_eq!(parse_uid_seconds("20260130_100000_000"), Some(36000.0));
    }

    #[test]
    fn parses_bare_time_block() {
        assert_eq!(parse_uid_seconds("143005_250"), Some(14.0 * 3600.0 + 30.0 * 60.0 + 5.25));
    }

    #[test]
    fn skips_surrounding_label_text() {
        assert_eq!(parse_uid_seconds("PKG-20260130_091500_750-A"), Some(34500.75));
    }

    #[test]
    fn rejects_uid_without_time_block(){
        assert_eq!(parse_uid_seconds(""), None);
        assert_eq!(parse_uid_seconds("PARCEL-42"), None);
        assert_eq!(parse_uid_seconds("123456"), None);
    }
}
