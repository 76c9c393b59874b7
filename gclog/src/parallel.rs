/// Parallel (throughput) collector patterns.
///
/// Two structural shapes per era: the young collection and the full
/// collection.  Full-GC records are told apart from minor-GC records by their
/// two bracketed generation segments before the occupancy triple (JDK8) or by
/// the `Pause Full` phase name (JDK9).  JDK8 records carry a `[Times: ...]`
/// trailer; unified logging prints CPU accounting elsewhere and the original
/// Parallel shapes do not include it.
use crate::detect::LogFormat;
use crate::event::{cap_f64, cap_timestamp_ms, cap_u64, EventParser, GcEvent, GcKind};
use crate::pattern::{HEAP_SUFFIXED, PAUSE_MS, PAUSE_SECS, TIMES, TIMESTAMP};
use crate::units;
use anyhow::Result;
use regex::{Captures, Regex};

pub struct ParallelParser {
    format: LogFormat,
    minor_re: Regex,
    full_re: Regex,
}

impl ParallelParser {
    pub fn new(format: LogFormat) -> ParallelParser {
        let (minor_re, full_re) = match format {
            LogFormat::Jdk8 => (
                Regex::new(&format!(
                    r"(?s)^{TIMESTAMP}\+\d{{4}}: .*\[GC [^\[]+\[[^\]]+\] (?P<before>\d+)K->(?P<after>\d+)K\((?P<max>\d+)K\){PAUSE_SECS}.*{TIMES}"
                ))
                .unwrap(),
                Regex::new(&format!(
                    r"(?s)^{TIMESTAMP}\+\d{{4}}: .*\[Full GC [^\[]+\[[^\]]+\][^\[]+\[[^\]]+\] (?P<before>\d+)K->(?P<after>\d+)K\((?P<max>\d+)K\),.*{PAUSE_SECS}.*{TIMES}"
                ))
                .unwrap(),
            ),
            LogFormat::Jdk9 => (
                Regex::new(&format!(
                    r"^\[{TIMESTAMP}\+\d{{4}}\].*GC\(\d+\) Pause Young .* {HEAP_SUFFIXED} {PAUSE_MS}"
                ))
                .unwrap(),
                Regex::new(&format!(
                    r"^\[{TIMESTAMP}\+\d{{4}}\].*GC\(\d+\) Pause Full .* {HEAP_SUFFIXED} {PAUSE_MS}"
                ))
                .unwrap(),
            ),
        };
        ParallelParser {
            format,
            minor_re,
            full_re,
        }
    }

    fn event(&self, kind: GcKind, caps: &Captures) -> Result<GcEvent> {
        let mut e = GcEvent::new(kind, cap_timestamp_ms(caps)?);
        match self.format {
            LogFormat::Jdk8 => {
                let before_kb = cap_u64(caps, "before")?;
                let after_kb = cap_u64(caps, "after")?;
                let pause_ms = units::secs_to_ms(cap_f64(caps, "pause")?);
                e.heap_before_gb = Some(units::kb_to_gb(before_kb));
                e.heap_after_gb = Some(units::kb_to_gb(after_kb));
                e.heap_max_gb = Some(units::kb_to_gb(cap_u64(caps, "max")?));
                e.heap_before_bytes = Some(before_kb * 1024);
                e.heap_after_bytes = Some(after_kb * 1024);
                e.after_offset_ms = pause_ms as i64;
                e.pause_ms = Some(pause_ms);
                e.cpu_user_ms = Some(units::secs_to_ms(cap_f64(caps, "user")?));
                e.cpu_sys_ms = Some(units::secs_to_ms(cap_f64(caps, "sys")?));
                e.cpu_real_ms = Some(units::secs_to_ms(cap_f64(caps, "real")?));
            }
            LogFormat::Jdk9 => {
                let pause_ms = cap_f64(caps, "pause")?.round();
                e.heap_before_gb = Some(units::occupancy_to_gb(&caps["before"])?);
                e.heap_after_gb = Some(units::occupancy_to_gb(&caps["after"])?);
                e.heap_max_gb = Some(units::max_to_gb(&caps["max"])?);
                e.heap_before_bytes = Some(units::suffixed_to_bytes(&caps["before"])?);
                e.heap_after_bytes = Some(units::suffixed_to_bytes(&caps["after"])?);
                e.after_offset_ms = pause_ms as i64;
                e.pause_ms = Some(pause_ms);
            }
        }
        Ok(e)
    }
}

impl EventParser for ParallelParser {
    fn parse(&self, record: &str) -> Result<Option<GcEvent>> {
        if let Some(caps) = self.minor_re.captures(record) {
            return Ok(Some(self.event(GcKind::MinorGc, &caps)?));
        }
        if let Some(caps) = self.full_re.captures(record) {
            return Ok(Some(self.event(GcKind::FullGc, &caps)?));
        }
        Ok(None)
    }
}

#[test]
fn test_jdk8_minor() {
    let p = ParallelParser::new(LogFormat::Jdk8);
    let rec = "2020-01-01T00:00:00.000+0000: 0.123: [GC (Allocation Failure) \
               [PSYoungGen: 100K->50K(200K)] 1000K->500K(2000K), 0.0100000 secs] \
               [Times: user=0.01 sys=0.00, real=0.01 secs]\n";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::MinorGc);
    assert_eq!(e.timestamp_ms, 1577836800000);
    assert_eq!(e.pause_ms, Some(10.0));
    assert_eq!(e.after_offset_ms, 10);
    // 1000K and 500K disappear under two-decimal gigabyte rounding.
    assert_eq!(e.heap_before_gb, Some(0.0));
    assert_eq!(e.heap_after_gb, Some(0.0));
    assert_eq!(e.heap_before_bytes, Some(1024000));
    assert_eq!(e.heap_after_bytes, Some(512000));
    assert_eq!(e.cpu_user_ms, Some(10.0));
    assert_eq!(e.cpu_sys_ms, Some(0.0));
    assert_eq!(e.cpu_real_ms, Some(10.0));
}

#[test]
fn test_jdk8_full() {
    let p = ParallelParser::new(LogFormat::Jdk8);
    let rec = "2020-01-01T00:00:01.000+0000: 1.5: [Full GC (Ergonomics) \
               [PSYoungGen: 100K->0K(200K)] [ParOldGen: 2097052K->1048576K(3145728K)] \
               2097152K->1048576K(4194304K), [Metaspace: 6K->6K(100K)], 0.2000000 secs] \
               [Times: user=0.20 sys=0.01, real=0.20 secs]\n";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::FullGc);
    assert_eq!(e.pause_ms, Some(200.0));
    assert_eq!(e.heap_before_gb, Some(2.0));
    assert_eq!(e.heap_after_gb, Some(1.0));
    assert_eq!(e.heap_max_gb, Some(4.0));
}

#[test]
fn test_jdk9_minor_and_full() {
    let p = ParallelParser::new(LogFormat::Jdk9);
    let rec = "[2020-01-01T00:00:00.000+0000][info][gc] GC(5) Pause Young \
               (Allocation Failure) 100M->50M(512M) 12.345ms";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::MinorGc);
    assert_eq!(e.pause_ms, Some(12.0));
    assert_eq!(e.heap_before_gb, Some(0.1));
    assert_eq!(e.heap_after_gb, Some(0.05));
    assert_eq!(e.heap_max_gb, Some(1.0));
    assert_eq!(e.heap_before_bytes, Some(100 * 1024 * 1024));

    let rec = "[2020-01-01T00:00:10.000+0000][info][gc] GC(6) Pause Full \
               (Ergonomics) 512M->100M(512M) 321.000ms";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::FullGc);
    assert_eq!(e.pause_ms, Some(321.0));
}

#[test]
fn test_unmatched_record_is_dropped() {
    let p = ParallelParser::new(LogFormat::Jdk8);
    assert!(p
        .parse("2020-01-01T00:00:00.000+0000: Total time for which application threads were stopped")
        .unwrap()
        .is_none());
}
