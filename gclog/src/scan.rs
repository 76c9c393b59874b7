/// The single-pass driver: lines in, aggregated series and statistics out.
///
/// The scan streams physical lines through the record assembler and hands
/// each completed logical record to the detection/parse pipeline.  Collector
/// family and log format are decided on the first completed record and never
/// revisited; a first record that matches no family probe fails the whole
/// scan, since nothing later could be interpreted consistently anyway.
use crate::detect::{detect_gc_family, detect_log_format, GcFamily, LogFormat};
use crate::dotnet::TraceParser;
use crate::event::{create_parser, EventParser};
use crate::record::RecordAssembler;
use crate::series::SeriesAggregator;
use anyhow::{bail, Result};
use std::io::BufRead;

// Point-volume warning threshold, in events between warnings.
const EVENT_WARNING_THRESHOLD: usize = 10000;

pub struct ScanResult {
    pub family: GcFamily,
    pub format: LogFormat,
    pub agg: SeriesAggregator,
}

struct Pipeline {
    family: GcFamily,
    format: LogFormat,
    parser: Box<dyn EventParser>,
    agg: SeriesAggregator,
    event_count: usize,
}

impl Pipeline {
    // Classify the first record and lock the strategy for the run.
    fn new(record: &str, forced: Option<GcFamily>, verbose: bool) -> Result<Pipeline> {
        let family = match forced {
            Some(family) => family,
            None => match detect_gc_family(record) {
                Some((family, shown)) => {
                    if verbose {
                        eprintln!("Detected {} GC with line: {shown}", family.name());
                    }
                    family
                }
                None => bail!("Cannot recognize file format"),
            },
        };
        let format = match detect_log_format(record) {
            Some(format) => {
                if verbose {
                    eprintln!("Format: {}", format.name());
                }
                format
            }
            None => bail!("Cannot recognize file format"),
        };
        Ok(Pipeline {
            family,
            format,
            parser: create_parser(family, format),
            agg: SeriesAggregator::new(),
            event_count: 0,
        })
    }

    fn process(&mut self, record: &str) -> Result<()> {
        if let Some(event) = self.parser.parse(record)? {
            self.agg.record(&event);
            self.event_count += 1;
            if self.event_count > EVENT_WARNING_THRESHOLD {
                eprintln!("[WARNING] more than 10K points");
                self.event_count = 0;
            }
        }
        Ok(())
    }
}

fn feed(
    pipeline: &mut Option<Pipeline>,
    record: &str,
    forced: Option<GcFamily>,
    verbose: bool,
) -> Result<()> {
    if pipeline.is_none() {
        *pipeline = Some(Pipeline::new(record, forced, verbose)?);
    }
    if let Some(p) = pipeline.as_mut() {
        p.process(record)?;
    }
    Ok(())
}

/// Scan a JVM GC log.  `forced` bypasses the family probes; the log format
/// is always detected from the first record.
pub fn scan_log(
    input: impl BufRead,
    forced: Option<GcFamily>,
    verbose: bool,
) -> Result<ScanResult> {
    let mut asm = RecordAssembler::new();
    let mut pipeline: Option<Pipeline> = None;
    for line in input.lines() {
        let line = line?;
        if let Some(record) = asm.push_line(&line) {
            feed(&mut pipeline, &record, forced, verbose)?;
        }
    }
    if let Some(record) = asm.finish() {
        feed(&mut pipeline, &record, forced, verbose)?;
    }
    match pipeline {
        Some(p) => Ok(ScanResult {
            family: p.family,
            format: p.format,
            agg: p.agg,
        }),
        None => bail!("Cannot recognize file format"),
    }
}

/// Scan a .NET GC trace.  Offsets in the trace are applied to `base_ms`.
pub fn scan_trace(input: impl BufRead, base_ms: i64) -> Result<SeriesAggregator> {
    let parser = TraceParser::new(base_ms);
    let mut agg = SeriesAggregator::new();
    for line in input.lines() {
        let line = line?;
        if let Some(sample) = parser.parse_line(&line)? {
            agg.record_trace(&sample);
        }
    }
    Ok(agg)
}

#[cfg(test)]
use crate::series::SeriesId;

#[test]
fn test_scan_parallel_jdk8() {
    let log = "2020-01-01T00:00:00.000+0000: 0.1: [GC (Allocation Failure) \
               [PSYoungGen: 100K->50K(200K)] 1048576K->524288K(2097152K), 0.0100000 secs] \
               [Times: user=0.01 sys=0.00, real=0.01 secs]\n\
               2020-01-01T00:00:01.000+0000: 1.1: [GC (Allocation Failure) \
               [PSYoungGen: 100K->50K(200K)] 1572864K->524288K(2097152K), 0.0200000 secs] \
               [Times: user=0.02 sys=0.00, real=0.02 secs]\n";
    let res = scan_log(log.as_bytes(), None, false).unwrap();
    assert_eq!(res.family, GcFamily::Parallel);
    assert_eq!(res.format, LogFormat::Jdk8);
    assert_eq!(
        res.agg.series(SeriesId::HeapOccupancy),
        &[
            (1577836800000, 1.0),
            (1577836800010, 0.5),
            (1577836801000, 1.5),
            (1577836801020, 0.5)
        ]
    );
    assert_eq!(res.agg.series(SeriesId::MinorGc), &[
        (1577836800000, 10.0),
        (1577836801000, 20.0)
    ]);
    // 1G allocated before the first collection, another 1G before the second.
    assert_eq!(
        res.agg.stats.total_allocated_bytes(),
        2 * 1024 * 1024 * 1024
    );
}

#[test]
fn test_scan_includes_final_record() {
    // The last record has no successor line to flush it; the scan must.
    let log = "2020-01-01T00:00:00.000+0000: 0.1: [GC (Allocation Failure) \
               [PSYoungGen: 100K->50K(200K)] 1048576K->524288K(2097152K), 0.0100000 secs] \
               [Times: user=0.01 sys=0.00, real=0.01 secs]";
    let res = scan_log(log.as_bytes(), None, false).unwrap();
    assert_eq!(res.agg.series(SeriesId::MinorGc).len(), 1);
}

#[test]
fn test_scan_forced_family() {
    // No family marker anywhere, but the override carries the day.
    let log = "2020-01-01T00:00:00.000+0000: 0.496: [Concurrent cleanup 17M->18M(128M), 0.034 ms]\n\
               2020-01-01T00:00:01.000+0000: 1.0: [Concurrent cleanup 18M->19M(128M), 0.030 ms]\n";
    let res = scan_log(log.as_bytes(), Some(GcFamily::Shenandoah), false).unwrap();
    assert_eq!(res.family, GcFamily::Shenandoah);
    assert_eq!(res.agg.series(SeriesId::HeapOccupancy).len(), 4);
}

#[test]
fn test_scan_unrecognizable_first_record() {
    let log = "not a gc log at all\njust text\n";
    assert!(scan_log(log.as_bytes(), None, false).is_err());
}

#[test]
fn test_scan_empty_input() {
    assert!(scan_log("".as_bytes(), None, false).is_err());
}

#[test]
fn test_scan_trace() {
    let trace = "StartRelativeMSec,a,Generation,a,b,c,d,PauseMSec,Pause2,G0,G1,G2,LOH,G0B,e,f,g,G0A\n\
                 1000.0,x,0,a,b,c,d,5.5,0,1048576,1048576,1073741824,0,2097152,e,f,g,1048576\n";
    let agg = scan_trace(trace.as_bytes(), 0).unwrap();
    assert_eq!(agg.series(SeriesId::HeapGen0), &[(1000, 2.0), (1005, 1.0)]);
    assert_eq!(agg.series(SeriesId::PauseGen0), &[(1000, 5.0)]);
    assert_eq!(agg.stats.pause_count(), 1);
}