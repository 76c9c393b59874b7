/// Timestamp normalization.
///
/// Every recognized record opens with a date-time fragment of the shape
/// `YYYY-MM-DDTHH:MM:SS.mmm`, followed by a numeric zone suffix which is
/// ignored: the fragment is canonicalized as a UTC epoch-millisecond value.
/// Post-collection occupancy points are placed by adding a millisecond
/// offset to the canonical value at the call site.
use anyhow::Result;
use chrono::NaiveDateTime;

pub type TimestampMs = i64;

/// Parse a `YYYY-MM-DDTHH:MM:SS.mmm` fragment into epoch milliseconds.
pub fn epoch_ms_from_fragment(frag: &str) -> Result<TimestampMs> {
    let dt = NaiveDateTime::parse_from_str(frag, "%Y-%m-%dT%H:%M:%S%.3f")?;
    Ok(dt.and_utc().timestamp_millis())
}

#[test]
fn test_epoch_ms_from_fragment() {
    assert_eq!(
        epoch_ms_from_fragment("2020-01-01T00:00:00.000").unwrap(),
        1577836800000
    );
    assert_eq!(epoch_ms_from_fragment("1970-01-01T00:00:00.123").unwrap(), 123);
    assert_eq!(
        epoch_ms_from_fragment("1970-01-01T01:02:03.004").unwrap(),
        3600000 + 120000 + 3000 + 4
    );
    assert!(epoch_ms_from_fragment("2020-01-01").is_err());
    assert!(epoch_ms_from_fragment("garbage").is_err());
}

#[test]
fn test_offset_addition_is_exact() {
    let t = epoch_ms_from_fragment("2020-06-15T12:00:00.500").unwrap();
    assert_eq!(t + 0, t);
    assert_eq!(t + 37, epoch_ms_from_fragment("2020-06-15T12:00:00.537").unwrap());
}
