/// CMS (concurrent mark-sweep) collector patterns.
///
/// Three stop-the-world shapes carry measurements: the initial-mark and
/// final-remark pauses, which report a single occupancy value rather than a
/// before/after pair, and the full collection, whose occupancy transition is
/// recorded as instantaneous (both points at the record's own timestamp).
/// ParNew young collections are deliberately not matched; they identify the
/// log as CMS during detection but contribute no series.
///
/// CMS was removed before unified logging settled, so only the classic
/// record shapes exist; the format argument is accepted for uniformity with
/// the other strategies and ignored.
use crate::detect::LogFormat;
use crate::event::{cap_f64, cap_timestamp_ms, cap_u64, EventParser, GcEvent, GcKind};
use crate::pattern::{PAUSE_SECS, TIMES, TIMESTAMP};
use crate::units;
use anyhow::Result;
use regex::{Captures, Regex};

pub struct CmsParser {
    initial_mark_re: Regex,
    final_remark_re: Regex,
    full_re: Regex,
}

impl CmsParser {
    pub fn new(_format: LogFormat) -> CmsParser {
        CmsParser {
            initial_mark_re: Regex::new(&format!(
                r"(?s)^{TIMESTAMP}\+\d{{4}}: .*\[GC \(CMS Initial Mark\) .*\[1 CMS-initial-mark: [^\]]+\] (?P<before>\d+)K\((?P<max>\d+)K\){PAUSE_SECS}.*{TIMES}"
            ))
            .unwrap(),
            final_remark_re: Regex::new(&format!(
                r"(?s)^{TIMESTAMP}\+\d{{4}}: .*\[GC \(CMS Final Remark\) .*\[1 CMS-remark: [^\]]+\] (?P<before>\d+)K\((?P<max>\d+)K\){PAUSE_SECS}.*{TIMES}"
            ))
            .unwrap(),
            full_re: Regex::new(&format!(
                r"(?s)^{TIMESTAMP}\+\d{{4}}: .*\[CMS: [^\]]+\] (?P<before>\d+)K->(?P<after>\d+)K\((?P<max>\d+)K\), \[Metaspace: [^\]]+\]{PAUSE_SECS}.*{TIMES}"
            ))
            .unwrap(),
        }
    }

    fn cpu_times(e: &mut GcEvent, caps: &Captures) -> Result<()> {
        e.cpu_user_ms = Some(units::secs_to_ms(cap_f64(caps, "user")?));
        e.cpu_sys_ms = Some(units::secs_to_ms(cap_f64(caps, "sys")?));
        e.cpu_real_ms = Some(units::secs_to_ms(cap_f64(caps, "real")?));
        Ok(())
    }

    // Marking pauses report the occupancy at pause time only: a single heap
    // point, no transition, nothing for the allocation accounting.  The
    // capacity on these lines is the old generation's, not the heap's, and
    // is not reported.
    fn mark_event(&self, kind: GcKind, caps: &Captures) -> Result<GcEvent> {
        let mut e = GcEvent::new(kind, cap_timestamp_ms(caps)?);
        e.heap_before_gb = Some(units::kb_to_gb(cap_u64(caps, "before")?));
        e.pause_ms = Some(units::secs_to_ms(cap_f64(caps, "pause")?));
        Self::cpu_times(&mut e, caps)?;
        Ok(e)
    }
}

impl EventParser for CmsParser {
    fn parse(&self, record: &str) -> Result<Option<GcEvent>> {
        if let Some(caps) = self.initial_mark_re.captures(record) {
            return Ok(Some(self.mark_event(GcKind::InitialMark, &caps)?));
        }
        if let Some(caps) = self.final_remark_re.captures(record) {
            return Ok(Some(self.mark_event(GcKind::FinalRemark, &caps)?));
        }
        if let Some(caps) = self.full_re.captures(record) {
            let mut e = GcEvent::new(GcKind::FullGc, cap_timestamp_ms(&caps)?);
            let before_kb = cap_u64(&caps, "before")?;
            let after_kb = cap_u64(&caps, "after")?;
            e.heap_before_gb = Some(units::kb_to_gb(before_kb));
            e.heap_after_gb = Some(units::kb_to_gb(after_kb));
            // Round up so the plotted ceiling never dips below an occupancy
            // point.
            e.heap_max_gb = Some(units::kb_max_to_gb(cap_u64(&caps, "max")?));
            e.heap_before_bytes = Some(before_kb * 1024);
            e.heap_after_bytes = Some(after_kb * 1024);
            // The transition is recorded as instantaneous.
            e.after_offset_ms = 0;
            e.pause_ms = Some(units::secs_to_ms(cap_f64(&caps, "pause")?));
            Self::cpu_times(&mut e, &caps)?;
            return Ok(Some(e));
        }
        Ok(None)
    }
}

#[test]
fn test_initial_mark() {
    let p = CmsParser::new(LogFormat::Jdk8);
    let rec = "2020-01-01T00:00:01.000+0000: 5.0: [GC (CMS Initial Mark) \
               [1 CMS-initial-mark: 1048576K(2097152K)] 1153434K(3145728K), 0.0100000 secs] \
               [Times: user=0.01 sys=0.00, real=0.01 secs]\n";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::InitialMark);
    assert_eq!(e.heap_before_gb, Some(1.1));
    assert_eq!(e.heap_after_gb, None);
    assert_eq!(e.heap_max_gb, None);
    assert_eq!(e.pause_ms, Some(10.0));
    assert_eq!(e.cpu_user_ms, Some(10.0));
    // No transition, so nothing to feed the allocation accounting.
    assert_eq!(e.heap_before_bytes, None);
}

#[test]
fn test_final_remark() {
    let p = CmsParser::new(LogFormat::Jdk8);
    let rec = "2020-01-01T00:00:02.000+0000: 6.0: [GC (CMS Final Remark) \
               [YG occupancy: 50000 K (118016 K)]6.0: [Rescan (parallel) , 0.0050000 secs]\
               6.0: [weak refs processing, 0.0000500 secs]\
               [1 CMS-remark: 1048576K(2097152K)] 1100000K(3145728K), 0.0200000 secs] \
               [Times: user=0.05 sys=0.00, real=0.02 secs]\n";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::FinalRemark);
    assert_eq!(e.heap_before_gb, Some(1.05));
    assert_eq!(e.pause_ms, Some(20.0));
}

#[test]
fn test_full() {
    let p = CmsParser::new(LogFormat::Jdk8);
    let rec = "2020-01-01T00:00:03.000+0000: 7.0: [Full GC (Allocation Failure) \
               7.0: [CMS: 2097151K->1048576K(2097152K), 1.2345678 secs] \
               2100000K->1048576K(2200000K), [Metaspace: 6000K->6000K(1060864K)], \
               1.2400000 secs] [Times: user=1.24 sys=0.01, real=1.24 secs]\n";
    let e = p.parse(rec).unwrap().unwrap();
    assert_eq!(e.kind, GcKind::FullGc);
    assert_eq!(e.heap_before_gb, Some(2.0));
    assert_eq!(e.heap_after_gb, Some(1.0));
    // Capacity rounds up, not to nearest.
    assert_eq!(e.heap_max_gb, Some(3.0));
    assert_eq!(e.pause_ms, Some(1240.0));
    // The occupancy transition is recorded as instantaneous.
    assert_eq!(e.after_offset_ms, 0);
}

#[test]
fn test_parnew_minor_is_dropped() {
    // Young collections identify the log as CMS but carry no series data.
    let p = CmsParser::new(LogFormat::Jdk8);
    let rec = "2020-01-01T00:00:00.000+0000: 4.2: [GC (Allocation Failure) \
               4.2: [ParNew: 104960K->11519K(118016K), 0.0255862 secs] \
               1153434K->1060000K(2084096K), 0.0257235 secs] \
               [Times: user=0.07 sys=0.00, real=0.02 secs]\n";
    assert!(p.parse(rec).unwrap().is_none());
}

#[test]
fn test_concurrent_phases_are_dropped() {
    let p = CmsParser::new(LogFormat::Jdk8);
    let rec = "2020-01-01T00:00:04.000+0000: 8.0: [CMS-concurrent-mark: 0.1/0.1 secs] \
               [Times: user=0.2 sys=0.0, real=0.1 secs]\n";
    assert!(p.parse(rec).unwrap().is_none());
}
