/// Shenandoah collector patterns.
///
/// Shenandoah reports a pause-only record for each of its brief
/// stop-the-world phases; heap occupancy never appears on a pause line.
/// Occupancy is sampled instead from the `Concurrent cleanup` record, which
/// carries a before->after(max) triple and stands in for the end of every
/// cycle.  Pause values are printed in milliseconds in both log eras, so the
/// two formats differ only in the line prefix around the phase name.
use crate::detect::LogFormat;
use crate::event::{cap_f64, cap_timestamp_ms, EventParser, GcEvent, GcKind};
use crate::pattern::TIMESTAMP;
use crate::units;
use anyhow::Result;
use regex::Regex;

// Occupancy triple on the cleanup record; Shenandoah never prints K sizes.
const HEAP_TRIPLE: &str = r"(?P<before>\d+[MG])->(?P<after>\d+[MG])\((?P<max>\d+[MG])\)";

// Stop-the-world phase prefixes and the kinds they map to, tried in order.
// The prefixes deliberately stop short of variable suffixes such as
// "Refs" or the degeneration point in parentheses.
const PHASES: [(&str, GcKind); 7] = [
    ("Init Mark", GcKind::InitMark),
    ("Final Mark", GcKind::FinalMark),
    ("Init Update", GcKind::InitUpdate),
    ("Final Update", GcKind::FinalUpdate),
    ("Final Evac", GcKind::FinalEvac),
    ("Degenerated GC", GcKind::Degenerated),
    ("Full", GcKind::FullGc),
];

pub struct ShenandoahParser {
    pauses: Vec<(GcKind, Regex)>,
    heap_re: Regex,
}

impl ShenandoahParser {
    pub fn new(format: LogFormat) -> ShenandoahParser {
        let pauses = PHASES
            .iter()
            .map(|(phase, kind)| {
                let re = match format {
                    LogFormat::Jdk8 => Regex::new(&format!(
                        r"(?s)^{TIMESTAMP}\+\d{{4}}: .*\[Pause {phase}.*, (?P<pause>\d+\.\d+) ms\]"
                    ))
                    .unwrap(),
                    LogFormat::Jdk9 => Regex::new(&format!(
                        r"(?s)^\[{TIMESTAMP}\+\d{{4}}.* GC\(\d+\) Pause {phase}.* (?P<pause>\d+\.\d+)ms"
                    ))
                    .unwrap(),
                };
                (*kind, re)
            })
            .collect();
        let heap_re = match format {
            LogFormat::Jdk8 => Regex::new(&format!(
                r"(?s)^{TIMESTAMP}\+\d{{4}}: .*\[Concurrent cleanup.*{HEAP_TRIPLE}"
            ))
            .unwrap(),
            LogFormat::Jdk9 => Regex::new(&format!(
                r"(?s)^\[{TIMESTAMP}\+\d{{4}}.* GC\(\d+\) Concurrent cleanup {HEAP_TRIPLE}"
            ))
            .unwrap(),
        };
        ShenandoahParser { pauses, heap_re }
    }
}

impl EventParser for ShenandoahParser {
    fn parse(&self, record: &str) -> Result<Option<GcEvent>> {
        for (kind, re) in &self.pauses {
            if let Some(caps) = re.captures(record) {
                let mut e = GcEvent::new(*kind, cap_timestamp_ms(&caps)?);
                e.pause_ms = Some(cap_f64(&caps, "pause")?.round());
                return Ok(Some(e));
            }
        }
        if let Some(caps) = self.heap_re.captures(record) {
            let mut e = GcEvent::new(GcKind::ConcurrentCleanup, cap_timestamp_ms(&caps)?);
            e.heap_before_gb = Some(units::occupancy_to_gb(&caps["before"])?);
            e.heap_after_gb = Some(units::occupancy_to_gb(&caps["after"])?);
            e.heap_max_gb = Some(units::max_to_gb(&caps["max"])?);
            e.heap_before_bytes = Some(units::suffixed_to_bytes(&caps["before"])?);
            e.heap_after_bytes = Some(units::suffixed_to_bytes(&caps["after"])?);
            // The cleanup itself is nearly instantaneous; the post-cleanup
            // occupancy point is placed a nominal 10ms after the sample.
            e.after_offset_ms = 10;
            return Ok(Some(e));
        }
        Ok(None)
    }
}

#[test]
fn test_jdk8_pauses() {
    let p = ShenandoahParser::new(LogFormat::Jdk8);
    let cases = [
        ("[Pause Init Mark, 0.433 ms]", GcKind::InitMark, 0.0),
        ("[Pause Final Mark (process weakrefs), 1.551 ms]", GcKind::FinalMark, 2.0),
        ("[Pause Init Update Refs, 0.061 ms]", GcKind::InitUpdate, 0.0),
        ("[Pause Final Update Refs, 0.377 ms]", GcKind::FinalUpdate, 0.0),
        ("[Pause Final Evac, 0.120 ms]", GcKind::FinalEvac, 0.0),
        ("[Pause Degenerated GC (Mark), 27.123 ms]", GcKind::Degenerated, 27.0),
        ("[Pause Full 1000M->200M(2048M), 543.210 ms]", GcKind::FullGc, 543.0),
    ];
    for (body, want_kind, want_pause) in cases {
        let rec = format!("2020-01-01T00:00:00.000+0000: 0.489: {body}\n");
        let e = p.parse(&rec).unwrap().unwrap();
        assert_eq!(e.kind, want_kind, "{body}");
        assert_eq!(e.pause_ms, Some(want_pause), "{body}");
    }
}

#[test]
fn test_jdk8_concurrent_cleanup() {
    let p = ShenandoahParser::new(LogFormat::Jdk8);
    let rec = "2020-01-01T00:00:00.000+0000: 0.496: [Concurrent cleanup 17M->18M(128M), 0.034 ms]\n";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::ConcurrentCleanup);
    assert_eq!(e.heap_before_gb, Some(0.02));
    assert_eq!(e.heap_after_gb, Some(0.02));
    assert_eq!(e.heap_max_gb, Some(1.0));
    assert_eq!(e.after_offset_ms, 10);
    assert_eq!(e.pause_ms, None);
}

#[test]
fn test_jdk9_pause_and_cleanup() {
    let p = ShenandoahParser::new(LogFormat::Jdk9);
    let e = p
        .parse("[2020-01-01T00:00:00.000+0000][info][gc] GC(3) Pause Init Mark 0.433ms")
        .unwrap()
        .unwrap();
    assert_eq!(e.kind, GcKind::InitMark);
    assert_eq!(e.pause_ms, Some(0.0));

    let e = p
        .parse("[2020-01-01T00:00:00.100+0000][info][gc] GC(3) Pause Degenerated GC (Mark) 45.600ms")
        .unwrap()
        .unwrap();
    assert_eq!(e.kind, GcKind::Degenerated);
    assert_eq!(e.pause_ms, Some(46.0));

    let e = p
        .parse("[2020-01-01T00:00:00.200+0000][info][gc] GC(3) Concurrent cleanup 17M->18M(128M) 0.034ms")
        .unwrap()
        .unwrap();
    assert_eq!(e.kind, GcKind::ConcurrentCleanup);
    assert_eq!(e.heap_max_gb, Some(1.0));
}

#[test]
fn test_concurrent_marking_is_dropped() {
    let p = ShenandoahParser::new(LogFormat::Jdk8);
    let rec = "2020-01-01T00:00:00.000+0000: 0.491: [Concurrent marking 16M->17M(128M), 1.888 ms]\n";
    assert!(p.parse(rec).unwrap().is_none());
}
