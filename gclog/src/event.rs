/// The normalized measurement point extracted from one logical record, and
/// the strategy interface the per-collector parsers implement.
use crate::cms::CmsParser;
use crate::dates;
use crate::detect::{GcFamily, LogFormat};
use crate::g1::G1Parser;
use crate::parallel::ParallelParser;
use crate::shenandoah::ShenandoahParser;
use anyhow::{bail, Result};
use regex::Captures;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcKind {
    MinorGc,
    FullGc,
    InitialMark,
    FinalRemark,
    Cleanup,
    Mixed,
    /// A young pause carrying none of the recognized qualifier markers.  It is
    /// still recorded, under its own series.
    UnknownPause,
    // Shenandoah pause phases.
    InitMark,
    FinalMark,
    InitUpdate,
    FinalUpdate,
    FinalEvac,
    Degenerated,
    /// Shenandoah's periodic occupancy sample: heap data, no pause.
    ConcurrentCleanup,
    /// CPU accounting arriving in its own record (G1 unified logging), keyed
    /// by the same timestamp as the heap data it belongs with.
    CpuTimes,
}

/// One normalized GC measurement.  Heap values are gigabytes; the raw byte
/// counts ride along so that allocation deltas are accumulated in a single
/// consistent unit no matter what the source format tracked.
#[derive(Debug, Clone)]
pub struct GcEvent {
    pub kind: GcKind,
    pub timestamp_ms: i64,
    pub heap_before_gb: Option<f64>,
    pub heap_after_gb: Option<f64>,
    pub heap_max_gb: Option<f64>,
    pub heap_before_bytes: Option<u64>,
    pub heap_after_bytes: Option<u64>,
    /// Where the post-collection occupancy point lands, relative to
    /// `timestamp_ms`.  Usually the pause duration.
    pub after_offset_ms: i64,
    pub pause_ms: Option<f64>,
    pub cpu_user_ms: Option<f64>,
    pub cpu_sys_ms: Option<f64>,
    pub cpu_real_ms: Option<f64>,
}

impl GcEvent {
    pub fn new(kind: GcKind, timestamp_ms: i64) -> GcEvent {
        GcEvent {
            kind,
            timestamp_ms,
            heap_before_gb: None,
            heap_after_gb: None,
            heap_max_gb: None,
            heap_before_bytes: None,
            heap_after_bytes: None,
            after_offset_ms: 0,
            pause_ms: None,
            cpu_user_ms: None,
            cpu_sys_ms: None,
            cpu_real_ms: None,
        }
    }
}

/// A family+format-specific matching strategy.  Patterns are tried in a fixed
/// priority order; the first match determines the outcome.  A record matching
/// no pattern yields Ok(None) and is dropped -- collector logs are full of
/// diagnostic lines that carry no measurement.  A matched pattern whose
/// captured numbers fail to parse is a hard error.
pub trait EventParser {
    fn parse(&self, record: &str) -> Result<Option<GcEvent>>;
}

/// Select the strategy for the run.  Called once, after detection; the
/// returned value is held for the lifetime of the pass.
pub fn create_parser(family: GcFamily, format: LogFormat) -> Box<dyn EventParser> {
    match family {
        GcFamily::Parallel => Box::new(ParallelParser::new(format)),
        GcFamily::Cms => Box::new(CmsParser::new(format)),
        GcFamily::G1 => Box::new(G1Parser::new(format)),
        GcFamily::Shenandoah => Box::new(ShenandoahParser::new(format)),
    }
}

// Capture-group extraction helpers.  The groups always exist when the
// enclosing pattern matched; a value that fails numeric parsing is malformed
// input inside a matched pattern and is propagated as an error.

pub(crate) fn cap_f64(caps: &Captures, name: &str) -> Result<f64> {
    let s = &caps[name];
    match f64::from_str(s) {
        Ok(x) => Ok(x),
        Err(_) => bail!("Malformed numeric field {name}: {s}"),
    }
}

pub(crate) fn cap_u64(caps: &Captures, name: &str) -> Result<u64> {
    let s = &caps[name];
    match u64::from_str(s) {
        Ok(x) => Ok(x),
        Err(_) => bail!("Malformed numeric field {name}: {s}"),
    }
}

pub(crate) fn cap_timestamp_ms(caps: &Captures) -> Result<i64> {
    dates::epoch_ms_from_fragment(&caps["ts"])
}
