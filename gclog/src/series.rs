/// Accumulation of normalized measurements into named time series and
/// running statistics.
///
/// Every series is a vector of (epoch-ms, value) points in arrival order.
/// Heap occupancy transitions contribute two points: the pre-collection
/// value at the record timestamp and the post-collection value at the
/// timestamp plus the event's offset.  Pauses go to a per-kind series in
/// milliseconds, except full and degenerated collections whose pauses are
/// long enough to plot in seconds on their own axis.
use crate::dotnet::TraceSample;
use crate::event::{GcEvent, GcKind};
use crate::units;
use anyhow::{bail, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesId {
    HeapOccupancy,
    MaxHeap,
    MinorGc,
    FullGc,
    InitialMark,
    FinalRemark,
    Cleanup,
    Mixed,
    Unknown,
    InitMark,
    FinalMark,
    InitUpdate,
    FinalUpdate,
    FinalEvac,
    Degenerated,
    CpuUser,
    CpuSys,
    CpuReal,
    HeapGen0,
    HeapGen1,
    HeapGen2,
    HeapLoh,
    HeapTotal,
    PauseGen0,
    PauseGen1,
    PauseInitialMark,
    PauseFinalMark,
}

impl SeriesId {
    /// The JavaScript variable-name stem the series is emitted under.
    pub fn var_name(&self) -> &'static str {
        match self {
            SeriesId::HeapOccupancy => "heap",
            SeriesId::MaxHeap => "heapmax",
            SeriesId::MinorGc => "minorgc",
            SeriesId::FullGc => "fullgc",
            SeriesId::InitialMark => "initialmark",
            SeriesId::FinalRemark => "finalremark",
            SeriesId::Cleanup => "cleanup",
            SeriesId::Mixed => "mixed",
            SeriesId::Unknown => "unknown",
            SeriesId::InitMark => "init_mark",
            SeriesId::FinalMark => "final_mark",
            SeriesId::InitUpdate => "init_update",
            SeriesId::FinalUpdate => "final_update",
            SeriesId::FinalEvac => "final_evac",
            SeriesId::Degenerated => "degenerated",
            SeriesId::CpuUser => "user",
            SeriesId::CpuSys => "sys",
            SeriesId::CpuReal => "real",
            SeriesId::HeapGen0 => "heap_gen0",
            SeriesId::HeapGen1 => "heap_gen1",
            SeriesId::HeapGen2 => "heap_gen2",
            SeriesId::HeapLoh => "heap_gen3",
            SeriesId::HeapTotal => "heap_total",
            SeriesId::PauseGen0 => "pause_gen0",
            SeriesId::PauseGen1 => "pause_gen1",
            SeriesId::PauseInitialMark => "pause_initialmark",
            SeriesId::PauseFinalMark => "pause_finalmark",
        }
    }
}

// Which pause series a kind feeds, and whether the value is rescaled to
// seconds for the second axis.  None: the kind carries no plottable pause.
fn pause_series(kind: GcKind) -> Option<(SeriesId, bool)> {
    match kind {
        GcKind::MinorGc => Some((SeriesId::MinorGc, false)),
        GcKind::FullGc => Some((SeriesId::FullGc, true)),
        GcKind::InitialMark => Some((SeriesId::InitialMark, false)),
        GcKind::FinalRemark => Some((SeriesId::FinalRemark, false)),
        GcKind::Cleanup => Some((SeriesId::Cleanup, false)),
        GcKind::Mixed => Some((SeriesId::Mixed, false)),
        GcKind::UnknownPause => Some((SeriesId::Unknown, false)),
        GcKind::InitMark => Some((SeriesId::InitMark, false)),
        GcKind::FinalMark => Some((SeriesId::FinalMark, false)),
        GcKind::InitUpdate => Some((SeriesId::InitUpdate, false)),
        GcKind::FinalUpdate => Some((SeriesId::FinalUpdate, false)),
        GcKind::FinalEvac => Some((SeriesId::FinalEvac, false)),
        GcKind::Degenerated => Some((SeriesId::Degenerated, true)),
        GcKind::ConcurrentCleanup | GcKind::CpuTimes => None,
    }
}

/// Pause statistics and allocation accounting over a whole run.
pub struct RunningStats {
    total_allocated_bytes: i64,
    previous_usage_bytes: i64,
    pauses: Vec<f64>,
    sorted: bool,
}

impl RunningStats {
    fn new() -> RunningStats {
        RunningStats {
            total_allocated_bytes: 0,
            previous_usage_bytes: 0,
            pauses: Vec::new(),
            sorted: false,
        }
    }

    fn record_transition(&mut self, before_bytes: u64, after_bytes: u64) {
        // Everything allocated since the previous collection is the growth
        // from the last post-collection occupancy to this pre-collection
        // occupancy.  The delta is signed: concurrent reclamation between
        // stop-the-world events shows up as a shrink and is deducted.
        self.total_allocated_bytes += before_bytes as i64 - self.previous_usage_bytes;
        self.previous_usage_bytes = after_bytes as i64;
    }

    fn record_pause(&mut self, pause_ms: f64) {
        self.pauses.push(pause_ms);
        self.sorted = false;
    }

    pub fn total_allocated_bytes(&self) -> i64 {
        self.total_allocated_bytes
    }

    pub fn pause_count(&self) -> usize {
        self.pauses.len()
    }

    pub fn mean_pause_ms(&self) -> f64 {
        if self.pauses.is_empty() {
            0.0
        } else {
            self.pauses.iter().sum::<f64>() / self.pauses.len() as f64
        }
    }

    /// Nearest-rank pause percentile, `p` in [0,1].  The sample vector is
    /// sorted on demand and stays sorted until the next insertion.
    pub fn percentile(&mut self, p: f64) -> Result<f64> {
        if self.pauses.is_empty() {
            bail!("No pauses recorded");
        }
        if !self.sorted {
            self.pauses.sort_by(|a, b| a.partial_cmp(b).unwrap());
            self.sorted = true;
        }
        let ix = ((p * self.pauses.len() as f64).floor() as usize).min(self.pauses.len() - 1);
        Ok(self.pauses[ix])
    }
}

pub struct SeriesAggregator {
    series: HashMap<SeriesId, Vec<(i64, f64)>>,
    pub stats: RunningStats,
}

impl SeriesAggregator {
    pub fn new() -> SeriesAggregator {
        SeriesAggregator {
            series: HashMap::new(),
            stats: RunningStats::new(),
        }
    }

    fn push(&mut self, id: SeriesId, timestamp_ms: i64, value: f64) {
        self.series.entry(id).or_default().push((timestamp_ms, value));
    }

    /// The points accumulated for a series; empty when nothing fed it.
    pub fn series(&self, id: SeriesId) -> &[(i64, f64)] {
        self.series.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Fold one JVM measurement into the series and the statistics.
    pub fn record(&mut self, e: &GcEvent) {
        if let Some(before) = e.heap_before_gb {
            self.push(SeriesId::HeapOccupancy, e.timestamp_ms, before);
        }
        if let Some(after) = e.heap_after_gb {
            self.push(SeriesId::HeapOccupancy, e.timestamp_ms + e.after_offset_ms, after);
        }
        if let Some(max) = e.heap_max_gb {
            self.push(SeriesId::MaxHeap, e.timestamp_ms, max);
        }
        if let (Some(before), Some(after)) = (e.heap_before_bytes, e.heap_after_bytes) {
            self.stats.record_transition(before, after);
        }
        if let Some(pause_ms) = e.pause_ms {
            if let Some((id, in_seconds)) = pause_series(e.kind) {
                let value = if in_seconds {
                    units::round3(pause_ms / 1000.0)
                } else {
                    pause_ms
                };
                self.push(id, e.timestamp_ms, value);
            }
            self.stats.record_pause(pause_ms);
        }
        if let Some(user) = e.cpu_user_ms {
            self.push(SeriesId::CpuUser, e.timestamp_ms, user);
        }
        if let Some(sys) = e.cpu_sys_ms {
            self.push(SeriesId::CpuSys, e.timestamp_ms, sys);
        }
        if let Some(real) = e.cpu_real_ms {
            self.push(SeriesId::CpuReal, e.timestamp_ms, real);
        }
    }

    /// Fold one .NET trace sample into the series and the statistics.
    pub fn record_trace(&mut self, s: &TraceSample) {
        self.push(SeriesId::HeapGen0, s.timestamp_ms, s.gen0_before_mb);
        self.push(
            SeriesId::HeapGen0,
            s.timestamp_ms + s.pause_ms as i64,
            s.gen0_after_mb,
        );
        self.push(SeriesId::HeapGen1, s.timestamp_ms, s.gen1_mb);
        self.push(SeriesId::HeapGen2, s.timestamp_ms, s.gen2_gb);
        self.push(SeriesId::HeapLoh, s.timestamp_ms, s.loh_gb);
        self.push(SeriesId::HeapTotal, s.timestamp_ms, s.total_gb);
        match s.generation {
            0 => self.push(SeriesId::PauseGen0, s.timestamp_ms, s.pause_ms),
            1 => self.push(SeriesId::PauseGen1, s.timestamp_ms, s.pause_ms),
            _ => {
                self.push(SeriesId::PauseInitialMark, s.timestamp_ms, s.pause_ms);
                if let Some(pause2) = s.pause2_ms {
                    self.push(SeriesId::PauseFinalMark, s.timestamp_ms, pause2);
                }
            }
        }
        // Only the primary suspension counts toward the pause statistics; the
        // generation-2 secondary pause would double-count the same cycle.
        self.stats.record_pause(s.pause_ms);
    }
}

impl Default for SeriesAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
fn minor(ts: i64, before_gb: f64, after_gb: f64, before_b: u64, after_b: u64, pause: f64) -> GcEvent {
    let mut e = GcEvent::new(GcKind::MinorGc, ts);
    e.heap_before_gb = Some(before_gb);
    e.heap_after_gb = Some(after_gb);
    e.heap_before_bytes = Some(before_b);
    e.heap_after_bytes = Some(after_b);
    e.after_offset_ms = pause as i64;
    e.pause_ms = Some(pause);
    e
}

#[test]
fn test_occupancy_points() {
    let mut agg = SeriesAggregator::new();
    agg.record(&minor(1000, 2.0, 0.5, 2 << 30, 1 << 29, 25.0));
    assert_eq!(
        agg.series(SeriesId::HeapOccupancy),
        &[(1000, 2.0), (1025, 0.5)]
    );
    assert_eq!(agg.series(SeriesId::MinorGc), &[(1000, 25.0)]);
    assert!(agg.series(SeriesId::FullGc).is_empty());
}

#[test]
fn test_full_gc_pause_in_seconds() {
    let mut agg = SeriesAggregator::new();
    let mut e = GcEvent::new(GcKind::FullGc, 5000);
    e.pause_ms = Some(1234.0);
    agg.record(&e);
    assert_eq!(agg.series(SeriesId::FullGc), &[(5000, 1.234)]);
    // Statistics keep the millisecond value.
    assert_eq!(agg.stats.percentile(0.5).unwrap(), 1234.0);
}

#[test]
fn test_allocation_accounting() {
    let mut agg = SeriesAggregator::new();
    agg.record(&minor(0, 0.0, 0.0, 1000, 400, 1.0));
    agg.record(&minor(1000, 0.0, 0.0, 900, 300, 1.0));
    agg.record(&minor(2000, 0.0, 0.0, 800, 200, 1.0));
    // 1000 + (900-400) + (800-300).
    assert_eq!(agg.stats.total_allocated_bytes(), 2000);
}

#[test]
fn test_allocation_shrink_is_deducted() {
    // A heap that shrinks between collections, as under CMS or G1 concurrent
    // reclamation, lowers the running total.
    let mut agg = SeriesAggregator::new();
    agg.record(&minor(0, 0.0, 0.0, 1000, 900, 1.0));
    agg.record(&minor(1000, 0.0, 0.0, 500, 200, 1.0));
    // 1000 + (500-900).
    assert_eq!(agg.stats.total_allocated_bytes(), 600);
}

#[test]
fn test_percentiles() {
    let mut stats = RunningStats::new();
    for v in [5.0, 1.0, 3.0, 2.0, 4.0] {
        stats.record_pause(v);
    }
    assert_eq!(stats.percentile(0.0).unwrap(), 1.0);
    assert_eq!(stats.percentile(0.5).unwrap(), 3.0);
    assert_eq!(stats.percentile(0.99).unwrap(), 5.0);
    assert_eq!(stats.percentile(1.0).unwrap(), 5.0);
    assert_eq!(stats.pause_count(), 5);
    assert_eq!(stats.mean_pause_ms(), 3.0);
    // Insertion after a query re-sorts on the next query.
    stats.record_pause(0.5);
    assert_eq!(stats.percentile(0.0).unwrap(), 0.5);
}

#[test]
fn test_percentile_of_empty_run_is_an_error() {
    let mut stats = RunningStats::new();
    assert!(stats.percentile(0.5).is_err());
}

#[test]
fn test_trace_sample_routing() {
    use crate::dotnet::TraceSample;
    let mut agg = SeriesAggregator::new();
    agg.record_trace(&TraceSample {
        timestamp_ms: 100,
        generation: 2,
        pause_ms: 10.0,
        pause2_ms: Some(4.0),
        gen0_before_mb: 20.0,
        gen0_after_mb: 1.0,
        gen1_mb: 5.0,
        gen2_gb: 1.0,
        loh_gb: 0.5,
        total_gb: 1.51,
    });
    assert_eq!(agg.series(SeriesId::HeapGen0), &[(100, 20.0), (110, 1.0)]);
    assert_eq!(agg.series(SeriesId::PauseInitialMark), &[(100, 10.0)]);
    assert_eq!(agg.series(SeriesId::PauseFinalMark), &[(100, 4.0)]);
    assert!(agg.series(SeriesId::PauseGen0).is_empty());
    assert_eq!(agg.stats.pause_count(), 1);
}
