/// G1 collector patterns.
///
/// The two eras differ more for G1 than for any other family.  Classic logs
/// spread one collection over many physical lines, with the pause on the
/// opening line, the whole-heap transition on a later `Heap:` summary line
/// and the CPU trailer at the end; the phase is named by parenthesized
/// qualifiers on the opening line.  Unified logs put everything for a pause
/// on one line but move CPU accounting into a separate `User=... Sys=...
/// Real=...` record, which is surfaced as its own measurement and re-joined
/// downstream by timestamp.
use crate::detect::LogFormat;
use crate::event::{cap_f64, cap_timestamp_ms, EventParser, GcEvent, GcKind};
use crate::pattern::{HEAP_SUFFIXED, PAUSE_MS, PAUSE_SECS, TIMES, TIMESTAMP};
use crate::units;
use anyhow::Result;
use regex::{Captures, Regex};

// Whole-heap transition on the classic `Heap:` summary line.  Sizes there are
// always fractional, unlike the whole-number sizes of unified logging.
const HEAP_SUMMARY: &str = r"Heap: (?P<before>\d+\.\d+[KMG])\(\d+\.\d+[KMG]\)->(?P<after>\d+\.\d+[KMG])\((?P<max>\d+\.\d+[KMG])\)";

pub enum G1Parser {
    Jdk8 {
        young_re: Regex,
        remark_re: Regex,
        cleanup_re: Regex,
        mixed_re: Regex,
        full_re: Regex,
    },
    Jdk9 {
        young_re: Regex,
        remark_re: Regex,
        times_re: Regex,
    },
}

impl G1Parser {
    pub fn new(format: LogFormat) -> G1Parser {
        match format {
            LogFormat::Jdk8 => G1Parser::Jdk8 {
                young_re: Regex::new(&format!(
                    r"(?s)^{TIMESTAMP}\+\d{{4}}: .*\[GC pause .* \(young\).*{PAUSE_SECS}.*{HEAP_SUMMARY}.*{TIMES}"
                ))
                .unwrap(),
                remark_re: Regex::new(&format!(
                    r"(?s)^{TIMESTAMP}\+\d{{4}}: .*\[GC remark .*{PAUSE_SECS}.*{TIMES}"
                ))
                .unwrap(),
                cleanup_re: Regex::new(&format!(
                    r"(?s)^{TIMESTAMP}\+\d{{4}}: .*\[GC cleanup {HEAP_SUFFIXED}.*{PAUSE_SECS}.*{TIMES}"
                ))
                .unwrap(),
                mixed_re: Regex::new(&format!(
                    r"(?s)^{TIMESTAMP}\+\d{{4}}: .*\[GC pause .* \(mixed\).*{PAUSE_SECS}.*{HEAP_SUMMARY}.*{TIMES}"
                ))
                .unwrap(),
                full_re: Regex::new(&format!(
                    r"(?s)^{TIMESTAMP}\+\d{{4}}: .*\[Full GC \([^\)]+\).*{PAUSE_SECS}.*{HEAP_SUMMARY}.*{TIMES}"
                ))
                .unwrap(),
            },
            LogFormat::Jdk9 => G1Parser::Jdk9 {
                young_re: Regex::new(&format!(
                    r"^\[{TIMESTAMP}\+\d{{4}}\].*GC\(\d+\) Pause Young .* {HEAP_SUFFIXED} {PAUSE_MS}"
                ))
                .unwrap(),
                remark_re: Regex::new(&format!(
                    r"^\[{TIMESTAMP}\+\d{{4}}\].*GC\(\d+\) Pause Remark {HEAP_SUFFIXED} {PAUSE_MS}"
                ))
                .unwrap(),
                times_re: Regex::new(&format!(
                    r"^\[{TIMESTAMP}\+\d{{4}}\].*GC\(\d+\) User=(?P<user>\d+\.\d+)s Sys=(?P<sys>\d+\.\d+)s Real=(?P<real>\d+\.\d+)s"
                ))
                .unwrap(),
            },
        }
    }

    // Classic multi-line record with pause, whole-heap transition and CPU
    // trailer.
    fn classic_event(kind: GcKind, caps: &Captures) -> Result<GcEvent> {
        let mut e = GcEvent::new(kind, cap_timestamp_ms(caps)?);
        let pause_ms = units::secs_to_ms(cap_f64(caps, "pause")?);
        e.heap_before_gb = Some(units::occupancy_to_gb(&caps["before"])?);
        e.heap_after_gb = Some(units::occupancy_to_gb(&caps["after"])?);
        e.heap_max_gb = Some(units::max_to_gb(&caps["max"])?);
        e.heap_before_bytes = Some(units::suffixed_to_bytes(&caps["before"])?);
        e.heap_after_bytes = Some(units::suffixed_to_bytes(&caps["after"])?);
        e.after_offset_ms = pause_ms as i64;
        e.pause_ms = Some(pause_ms);
        e.cpu_user_ms = Some(units::secs_to_ms(cap_f64(caps, "user")?));
        e.cpu_sys_ms = Some(units::secs_to_ms(cap_f64(caps, "sys")?));
        e.cpu_real_ms = Some(units::secs_to_ms(cap_f64(caps, "real")?));
        Ok(e)
    }

    fn unified_event(kind: GcKind, caps: &Captures) -> Result<GcEvent> {
        let mut e = GcEvent::new(kind, cap_timestamp_ms(caps)?);
        let pause_ms = cap_f64(caps, "pause")?.round();
        e.heap_before_gb = Some(units::occupancy_to_gb(&caps["before"])?);
        e.heap_after_gb = Some(units::occupancy_to_gb(&caps["after"])?);
        e.heap_max_gb = Some(units::max_to_gb(&caps["max"])?);
        e.heap_before_bytes = Some(units::suffixed_to_bytes(&caps["before"])?);
        e.heap_after_bytes = Some(units::suffixed_to_bytes(&caps["after"])?);
        e.after_offset_ms = pause_ms as i64;
        e.pause_ms = Some(pause_ms);
        Ok(e)
    }

    // Map the parenthesized qualifiers of a unified young pause onto a kind.
    // Unrecognized qualifier sets are still measurements; they go to their
    // own series rather than being dropped.
    fn unified_young_kind(record: &str) -> GcKind {
        if record.contains("(Concurrent Start)") {
            GcKind::InitialMark
        } else if record.contains("(Normal)") {
            GcKind::MinorGc
        } else if record.contains("(Prepare Mixed)") {
            GcKind::Cleanup
        } else if record.contains("(Mixed)") {
            GcKind::Mixed
        } else {
            GcKind::UnknownPause
        }
    }
}

impl EventParser for G1Parser {
    fn parse(&self, record: &str) -> Result<Option<GcEvent>> {
        match self {
            G1Parser::Jdk8 {
                young_re,
                remark_re,
                cleanup_re,
                mixed_re,
                full_re,
            } => {
                if let Some(caps) = young_re.captures(record) {
                    // The concurrent-cycle kickoff is a young pause with an
                    // extra qualifier.
                    let kind = if record.contains("(initial-mark)") {
                        GcKind::InitialMark
                    } else {
                        GcKind::MinorGc
                    };
                    return Ok(Some(Self::classic_event(kind, &caps)?));
                }
                if let Some(caps) = remark_re.captures(record) {
                    let mut e = GcEvent::new(GcKind::FinalRemark, cap_timestamp_ms(&caps)?);
                    e.pause_ms = Some(units::secs_to_ms(cap_f64(&caps, "pause")?));
                    e.cpu_user_ms = Some(units::secs_to_ms(cap_f64(&caps, "user")?));
                    e.cpu_sys_ms = Some(units::secs_to_ms(cap_f64(&caps, "sys")?));
                    e.cpu_real_ms = Some(units::secs_to_ms(cap_f64(&caps, "real")?));
                    return Ok(Some(e));
                }
                if let Some(caps) = cleanup_re.captures(record) {
                    let mut e = GcEvent::new(GcKind::Cleanup, cap_timestamp_ms(&caps)?);
                    let pause_ms = units::secs_to_ms(cap_f64(&caps, "pause")?);
                    e.heap_before_gb = Some(units::occupancy_to_gb(&caps["before"])?);
                    e.heap_after_gb = Some(units::occupancy_to_gb(&caps["after"])?);
                    e.heap_max_gb = Some(units::max_to_gb(&caps["max"])?);
                    e.heap_before_bytes = Some(units::suffixed_to_bytes(&caps["before"])?);
                    e.heap_after_bytes = Some(units::suffixed_to_bytes(&caps["after"])?);
                    e.after_offset_ms = pause_ms as i64;
                    e.pause_ms = Some(pause_ms);
                    e.cpu_user_ms = Some(units::secs_to_ms(cap_f64(&caps, "user")?));
                    e.cpu_sys_ms = Some(units::secs_to_ms(cap_f64(&caps, "sys")?));
                    e.cpu_real_ms = Some(units::secs_to_ms(cap_f64(&caps, "real")?));
                    return Ok(Some(e));
                }
                if let Some(caps) = mixed_re.captures(record) {
                    return Ok(Some(Self::classic_event(GcKind::Mixed, &caps)?));
                }
                if let Some(caps) = full_re.captures(record) {
                    return Ok(Some(Self::classic_event(GcKind::FullGc, &caps)?));
                }
                Ok(None)
            }
            G1Parser::Jdk9 {
                young_re,
                remark_re,
                times_re,
            } => {
                if let Some(caps) = young_re.captures(record) {
                    let kind = Self::unified_young_kind(record);
                    return Ok(Some(Self::unified_event(kind, &caps)?));
                }
                if let Some(caps) = remark_re.captures(record) {
                    // The remark line repeats the heap occupancy unchanged;
                    // only the pause is worth keeping.
                    let mut e = GcEvent::new(GcKind::FinalRemark, cap_timestamp_ms(&caps)?);
                    e.pause_ms = Some(cap_f64(&caps, "pause")?.round());
                    return Ok(Some(e));
                }
                if let Some(caps) = times_re.captures(record) {
                    let mut e = GcEvent::new(GcKind::CpuTimes, cap_timestamp_ms(&caps)?);
                    e.cpu_user_ms = Some(units::secs_to_ms(cap_f64(&caps, "user")?));
                    e.cpu_sys_ms = Some(units::secs_to_ms(cap_f64(&caps, "sys")?));
                    e.cpu_real_ms = Some(units::secs_to_ms(cap_f64(&caps, "real")?));
                    return Ok(Some(e));
                }
                Ok(None)
            }
        }
    }
}

#[test]
fn test_jdk8_young() {
    let p = G1Parser::new(LogFormat::Jdk8);
    let rec = "2020-01-01T00:00:00.000+0000: 0.630: [GC pause (G1 Evacuation Pause) (young), 0.0034756 secs]\n\
               \x20  [Parallel Time: 2.3 ms, GC Workers: 8]\n\
               \x20  [Eden: 24.0M(24.0M)->0.0B(24.0M) Survivors: 0.0B->3072.0K Heap: 512.0M(2048.0M)->100.0M(2048.0M)]\n\
               \x20[Times: user=0.02 sys=0.01, real=0.01 secs]\n";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::MinorGc);
    assert_eq!(e.heap_before_gb, Some(0.5));
    assert_eq!(e.heap_after_gb, Some(0.1));
    assert_eq!(e.heap_max_gb, Some(2.0));
    assert_eq!(e.pause_ms, Some(3.0));
    assert_eq!(e.cpu_user_ms, Some(20.0));
}

#[test]
fn test_jdk8_initial_mark() {
    let p = G1Parser::new(LogFormat::Jdk8);
    let rec = "2020-01-01T00:00:01.000+0000: 1.2: [GC pause (Metadata GC Threshold) (young) (initial-mark), 0.0100000 secs]\n\
               \x20  [Eden: 24.0M(24.0M)->0.0B(24.0M) Survivors: 0.0B->3072.0K Heap: 512.0M(2048.0M)->100.0M(2048.0M)]\n\
               \x20[Times: user=0.02 sys=0.00, real=0.01 secs]\n";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::InitialMark);
}

#[test]
fn test_jdk8_mixed_remark_cleanup_full() {
    let p = G1Parser::new(LogFormat::Jdk8);

    let rec = "2020-01-01T00:00:02.000+0000: 2.0: [GC pause (G1 Evacuation Pause) (mixed), 0.0050000 secs]\n\
               \x20  [Eden: 24.0M(24.0M)->0.0B(24.0M) Survivors: 0.0B->3072.0K Heap: 512.0M(2048.0M)->100.0M(2048.0M)]\n\
               \x20[Times: user=0.02 sys=0.00, real=0.01 secs]\n";
    assert_eq!(p.parse(rec).unwrap().unwrap().kind, GcKind::Mixed);

    let rec = "2020-01-01T00:00:03.000+0000: 3.0: [GC remark 3.0: [Finalize Marking, 0.0007422 secs] \
               3.0: [GC ref-proc, 0.0001 secs], 0.0032052 secs]\n\
               \x20[Times: user=0.01 sys=0.00, real=0.01 secs]\n";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::FinalRemark);
    assert_eq!(e.pause_ms, Some(3.0));
    assert_eq!(e.heap_before_gb, None);

    let rec = "2020-01-01T00:00:04.000+0000: 4.0: [GC cleanup 792M->92M(1024M), 0.0004928 secs]\n\
               \x20[Times: user=0.00 sys=0.00, real=0.00 secs]\n";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::Cleanup);
    assert_eq!(e.heap_before_gb, Some(0.77));
    assert_eq!(e.heap_after_gb, Some(0.09));
    assert_eq!(e.heap_max_gb, Some(1.0));

    let rec = "2020-01-01T00:00:05.000+0000: 5.0: [Full GC (Allocation Failure)  1802M->156M(2048M), 0.3000000 secs]\n\
               \x20  [Eden: 0.0B(102.0M)->0.0B(102.0M) Survivors: 0.0B->0.0B Heap: 1802.0M(2048.0M)->156.0M(2048.0M)]\n\
               \x20[Times: user=0.40 sys=0.01, real=0.30 secs]\n";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::FullGc);
    assert_eq!(e.pause_ms, Some(300.0));
    assert_eq!(e.heap_before_gb, Some(1.76));
}

#[test]
fn test_jdk9_young_kinds() {
    let p = G1Parser::new(LogFormat::Jdk9);
    let cases = [
        ("(Normal) (G1 Evacuation Pause)", GcKind::MinorGc),
        ("(Concurrent Start) (Metadata GC Threshold)", GcKind::InitialMark),
        ("(Prepare Mixed) (G1 Evacuation Pause)", GcKind::Cleanup),
        ("(Mixed) (G1 Evacuation Pause)", GcKind::Mixed),
        ("(Experimental Qualifier)", GcKind::UnknownPause),
    ];
    for (quals, want) in cases {
        let rec = format!(
            "[2020-01-01T00:00:00.000+0000][info][gc] GC(7) Pause Young {quals} 100M->50M(512M) 12.345ms"
        );
        let e = p.parse(&rec).unwrap().unwrap();
        assert_eq!(e.kind, want, "{quals}");
        assert_eq!(e.pause_ms, Some(12.0));
        assert_eq!(e.heap_before_gb, Some(0.1));
    }
}

#[test]
fn test_jdk9_remark_and_times() {
    let p = G1Parser::new(LogFormat::Jdk9);
    let e = p
        .parse("[2020-01-01T00:00:01.000+0000][info][gc] GC(8) Pause Remark 100M->100M(512M) 1.678ms")
        .unwrap()
        .unwrap();
    assert_eq!(e.kind, GcKind::FinalRemark);
    assert_eq!(e.pause_ms, Some(2.0));
    assert_eq!(e.heap_before_gb, None);

    let e = p
        .parse("[2020-01-01T00:00:01.000+0000][info][gc,cpu] GC(8) User=0.02s Sys=0.00s Real=0.01s")
        .unwrap()
        .unwrap();
    assert_eq!(e.kind, GcKind::CpuTimes);
    assert_eq!(e.cpu_user_ms, Some(20.0));
    assert_eq!(e.cpu_real_ms, Some(10.0));
}

#[test]
fn test_concurrent_cycle_lines_are_dropped() {
    let p = G1Parser::new(LogFormat::Jdk8);
    assert!(p
        .parse("2020-01-01T00:00:06.000+0000: 6.0: [GC concurrent-mark-start]\n")
        .unwrap()
        .is_none());
}
