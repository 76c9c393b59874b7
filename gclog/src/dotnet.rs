/// .NET GC trace parser.
///
/// The trace is comma-delimited, one collection per line, with a header line
/// beginning `StartRelativeMSec`.  Timestamps are milliseconds relative to
/// the start of the trace; the caller supplies the base epoch value the
/// offsets are applied to.  Generation sizes are raw byte counts.  The
/// generation number selects which pause series the line feeds: 0 and 1 are
/// ordinary collections, and a generation-2 (background) collection reports
/// two suspension pauses on the same line.
use crate::units;
use anyhow::{bail, Result};
use std::str::FromStr;

// Column positions in the trace.
const COL_ELAPSED_MS: usize = 0;
const COL_GENERATION: usize = 2;
const COL_PAUSE_MS: usize = 7;
const COL_PAUSE2_MS: usize = 8;
const COL_GEN0_BYTES: usize = 9;
const COL_GEN1_BYTES: usize = 10;
const COL_GEN2_BYTES: usize = 11;
const COL_LOH_BYTES: usize = 12;
const COL_GEN0_BEFORE_BYTES: usize = 13;
const COL_GEN0_AFTER_BYTES: usize = 17;

const MIN_COLUMNS: usize = 18;

/// One collection, normalized.  Gen0 and gen1 sizes are megabytes, the
/// larger generations and the total are gigabytes, pauses are whole
/// milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSample {
    pub timestamp_ms: i64,
    pub generation: u32,
    pub pause_ms: f64,
    /// Second suspension pause, present on generation-2 lines only.
    pub pause2_ms: Option<f64>,
    pub gen0_before_mb: f64,
    pub gen0_after_mb: f64,
    pub gen1_mb: f64,
    pub gen2_gb: f64,
    pub loh_gb: f64,
    pub total_gb: f64,
}

pub struct TraceParser {
    base_ms: i64,
}

impl TraceParser {
    pub fn new(base_ms: i64) -> TraceParser {
        TraceParser { base_ms }
    }

    /// Parse one trace line.  The header line and short lines yield None.
    pub fn parse_line(&self, line: &str) -> Result<Option<TraceSample>> {
        let cols = line.split(',').collect::<Vec<&str>>();
        if cols.len() < MIN_COLUMNS || cols[COL_ELAPSED_MS] == "StartRelativeMSec" {
            return Ok(None);
        }
        let elapsed_ms = field_f64(&cols, COL_ELAPSED_MS)?;
        let generation = field_u64(&cols, COL_GENERATION)? as u32;
        let pause_ms = field_f64(&cols, COL_PAUSE_MS)?.trunc();
        let pause2_ms = if generation == 2 {
            Some(field_f64(&cols, COL_PAUSE2_MS)?.trunc())
        } else {
            None
        };
        let gen0 = field_u64(&cols, COL_GEN0_BYTES)?;
        let gen1 = field_u64(&cols, COL_GEN1_BYTES)?;
        let gen2 = field_u64(&cols, COL_GEN2_BYTES)?;
        let loh = field_u64(&cols, COL_LOH_BYTES)?;
        Ok(Some(TraceSample {
            timestamp_ms: self.base_ms + elapsed_ms.round() as i64,
            generation,
            pause_ms,
            pause2_ms,
            gen0_before_mb: units::bytes_to_mb(field_u64(&cols, COL_GEN0_BEFORE_BYTES)?),
            gen0_after_mb: units::bytes_to_mb(field_u64(&cols, COL_GEN0_AFTER_BYTES)?),
            gen1_mb: units::bytes_to_mb(gen1),
            gen2_gb: units::bytes_to_gb(gen2),
            loh_gb: units::bytes_to_gb(loh),
            total_gb: units::bytes_to_gb(gen0 + gen1 + gen2 + loh),
        }))
    }
}

fn field_f64(cols: &[&str], ix: usize) -> Result<f64> {
    let s = cols[ix].trim();
    match f64::from_str(s) {
        Ok(x) => Ok(x),
        Err(_) => bail!("Malformed trace field {ix}: {s}"),
    }
}

fn field_u64(cols: &[&str], ix: usize) -> Result<u64> {
    let s = cols[ix].trim();
    match u64::from_str(s) {
        Ok(x) => Ok(x),
        Err(_) => bail!("Malformed trace field {ix}: {s}"),
    }
}

#[cfg(test)]
fn trace_line(elapsed: &str, generation: &str, pause: &str, pause2: &str) -> String {
    // 18 columns; unused positions hold placeholder values.
    let mut cols = vec!["0"; 18];
    cols[COL_ELAPSED_MS] = elapsed;
    cols[COL_GENERATION] = generation;
    cols[COL_PAUSE_MS] = pause;
    cols[COL_PAUSE2_MS] = pause2;
    cols[COL_GEN0_BYTES] = "10485760";
    cols[COL_GEN1_BYTES] = "5242880";
    cols[COL_GEN2_BYTES] = "1073741824";
    cols[COL_LOH_BYTES] = "536870912";
    cols[COL_GEN0_BEFORE_BYTES] = "20971520";
    cols[COL_GEN0_AFTER_BYTES] = "1048576";
    cols.join(",")
}

#[test]
fn test_gen0_line() {
    let p = TraceParser::new(1_000_000);
    let s = p
        .parse_line(&trace_line("1500.25", "0", "12.75", "0"))
        .unwrap()
        .unwrap();
    assert_eq!(s.timestamp_ms, 1_001_500);
    assert_eq!(s.generation, 0);
    // Pauses truncate, they do not round.
    assert_eq!(s.pause_ms, 12.0);
    assert_eq!(s.pause2_ms, None);
    assert_eq!(s.gen0_before_mb, 20.0);
    assert_eq!(s.gen0_after_mb, 1.0);
    assert_eq!(s.gen1_mb, 5.0);
    assert_eq!(s.gen2_gb, 1.0);
    assert_eq!(s.loh_gb, 0.5);
    // 10M + 5M + 1G + 0.5G.
    assert_eq!(s.total_gb, 1.51);
}

#[test]
fn test_gen2_line_has_second_pause() {
    let p = TraceParser::new(0);
    let s = p
        .parse_line(&trace_line("100", "2", "3.9", "7.9"))
        .unwrap()
        .unwrap();
    assert_eq!(s.generation, 2);
    assert_eq!(s.pause_ms, 3.0);
    assert_eq!(s.pause2_ms, Some(7.0));
}

#[test]
fn test_header_and_short_lines_skipped() {
    let p = TraceParser::new(0);
    let header = "StartRelativeMSec,x,Generation,a,b,c,d,PauseMSec,Pause2,G0,G1,G2,LOH,G0B,e,f,g,G0A";
    assert!(p.parse_line(header).unwrap().is_none());
    assert!(p.parse_line("123.0,0,0").unwrap().is_none());
    assert!(p.parse_line("").unwrap().is_none());
}

#[test]
fn test_malformed_field_is_an_error() {
    let p = TraceParser::new(0);
    assert!(p.parse_line(&trace_line("abc", "0", "1.0", "0")).is_err());
}
