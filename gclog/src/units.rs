/// Unit conversions shared by all the parser strategies.
///
/// GC logs express heap sizes in at least three ways: integer kilobytes with
/// no suffix (classic Parallel and CMS output), whole or fractional values
/// with a single trailing K/M/G suffix (G1, Shenandoah, unified logging), and
/// raw byte counts (.NET traces).  The canonical model is gigabytes.
/// Occupancy values round to two decimals; capacity values round up to a
/// whole gigabyte so that the reported maximum is never smaller than the
/// actual heap.
use anyhow::{bail, Result};
use std::str::FromStr;

const KB_PER_GB: f64 = 1024.0 * 1024.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

// Split a suffixed size into its numeric value and the divisor that takes it
// to gigabytes.
fn split_suffixed(s: &str) -> Result<(f64, f64)> {
    let divisor = match s.as_bytes().last() {
        Some(b'G') => 1.0,
        Some(b'M') => 1024.0,
        Some(b'K') => 1024.0 * 1024.0,
        _ => bail!("Missing unit suffix in size field: {s}"),
    };
    match f64::from_str(&s[..s.len() - 1]) {
        Ok(value) => Ok((value, divisor)),
        Err(_) => bail!("Malformed size field: {s}"),
    }
}

/// Suffixed occupancy value to gigabytes, two decimals.
pub fn occupancy_to_gb(s: &str) -> Result<f64> {
    let (value, divisor) = split_suffixed(s)?;
    Ok(round2(value / divisor))
}

/// Suffixed capacity value to gigabytes, rounded up to a whole gigabyte.
pub fn max_to_gb(s: &str) -> Result<f64> {
    let (value, divisor) = split_suffixed(s)?;
    Ok((value / divisor).ceil())
}

/// Suffixed value to a raw byte count, for allocation accounting.
pub fn suffixed_to_bytes(s: &str) -> Result<u64> {
    let (value, divisor) = split_suffixed(s)?;
    Ok((value * (BYTES_PER_GB / divisor)).round() as u64)
}

/// Integer-kilobyte value to gigabytes, two decimals.
pub fn kb_to_gb(kb: u64) -> f64 {
    round2(kb as f64 / KB_PER_GB)
}

/// Integer-kilobyte capacity to gigabytes, rounded up to a whole gigabyte.
pub fn kb_max_to_gb(kb: u64) -> f64 {
    (kb as f64 / KB_PER_GB).ceil()
}

/// Byte count to megabytes, two decimals (.NET trace sizes).
pub fn bytes_to_mb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_MB)
}

/// Byte count to gigabytes, two decimals (.NET trace sizes).
pub fn bytes_to_gb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_GB)
}

/// Fractional-second pause to whole milliseconds.
pub fn secs_to_ms(secs: f64) -> f64 {
    (secs * 1000.0).round()
}

#[test]
fn test_occupancy_to_gb() {
    assert_eq!(occupancy_to_gb("3G").unwrap(), 3.0);
    assert_eq!(occupancy_to_gb("512M").unwrap(), 0.5);
    assert_eq!(occupancy_to_gb("100M").unwrap(), 0.1);
    assert_eq!(occupancy_to_gb("1048576K").unwrap(), 1.0);
    assert_eq!(occupancy_to_gb("30.0M").unwrap(), 0.03);
    // Sub-centigigabyte values vanish under two-decimal rounding.
    assert_eq!(occupancy_to_gb("1000K").unwrap(), 0.0);
    assert!(occupancy_to_gb("123").is_err());
    assert!(occupancy_to_gb("xyzK").is_err());
}

#[test]
fn test_max_to_gb() {
    // Capacity must never be reported smaller than actual.
    assert_eq!(max_to_gb("1025M").unwrap(), 2.0);
    assert_eq!(max_to_gb("1024M").unwrap(), 1.0);
    assert_eq!(max_to_gb("1G").unwrap(), 1.0);
    assert_eq!(max_to_gb("100.0M").unwrap(), 1.0);
}

#[test]
fn test_suffixed_to_bytes() {
    assert_eq!(suffixed_to_bytes("2K").unwrap(), 2048);
    assert_eq!(suffixed_to_bytes("1M").unwrap(), 1048576);
    assert_eq!(suffixed_to_bytes("1G").unwrap(), 1073741824);
    assert_eq!(suffixed_to_bytes("3.5K").unwrap(), 3584);
}

#[test]
fn test_kb_conversions() {
    assert_eq!(kb_to_gb(1048576), 1.0);
    assert_eq!(kb_to_gb(1000), 0.0);
    assert_eq!(kb_to_gb(2097152), 2.0);
    assert_eq!(kb_max_to_gb(1048577), 2.0);
    assert_eq!(kb_max_to_gb(1), 1.0);
}

#[test]
fn test_bytes_conversions() {
    assert_eq!(bytes_to_mb(1048576), 1.0);
    assert_eq!(bytes_to_mb(1572864), 1.5);
    assert_eq!(bytes_to_gb(1073741824), 1.0);
}

#[test]
fn test_secs_to_ms() {
    assert_eq!(secs_to_ms(0.010), 10.0);
    assert_eq!(secs_to_ms(0.0104), 10.0);
    assert_eq!(secs_to_ms(1.5), 1500.0);
}
