/// One-shot classification of a GC log: which collector family wrote it and
/// which log-format era it uses.
///
/// Classification runs once, on the first logical record of the run, and the
/// result is locked for the remainder of the pass regardless of the apparent
/// shape of later records.  An explicit family override (from the command
/// line) bypasses the family probes; the format is always probed.
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcFamily {
    Parallel,
    Cms,
    G1,
    Shenandoah,
}

impl GcFamily {
    pub fn name(&self) -> &'static str {
        match self {
            GcFamily::Parallel => "Parallel",
            GcFamily::Cms => "CMS",
            GcFamily::G1 => "G1",
            GcFamily::Shenandoah => "Shenandoah",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Unbracketed leading date-time followed by `: ` (JDK8 and earlier).
    Jdk8,
    /// Bracketed leading date-time and `GC(n)` sequence tags (unified logging).
    Jdk9,
}

impl LogFormat {
    pub fn name(&self) -> &'static str {
        match self {
            LogFormat::Jdk8 => "JDK8",
            LogFormat::Jdk9 => "JDK9+",
        }
    }
}

// Family marker tokens, probed in order; the first hit wins.
const FAMILY_MARKERS: [(&str, GcFamily); 6] = [
    ("[PSYoungGen", GcFamily::Parallel),
    ("Using Parallel", GcFamily::Parallel),
    ("[ParNew", GcFamily::Cms),
    ("G1 Evacuation Pause", GcFamily::G1),
    ("[Pause ", GcFamily::Shenandoah),
    ("Using Shenandoah", GcFamily::Shenandoah),
];

/// Probe the record text for collector-specific marker tokens.  Returns the
/// family and the record prefix up to and including the matched token, for
/// the detection banner.
pub fn detect_gc_family(record: &str) -> Option<(GcFamily, &str)> {
    for (token, family) in FAMILY_MARKERS {
        if let Some(ix) = record.find(token) {
            return Some((family, &record[..ix + token.len()]));
        }
    }
    None
}

/// Classify the log-format era from the record's leading date-time shape.
pub fn detect_log_format(record: &str) -> Option<LogFormat> {
    if Regex::new(r"^\[\d{4}-\d{2}-\d{2}T").unwrap().is_match(record) {
        return Some(LogFormat::Jdk9);
    }
    if Regex::new(r"^\d{4}-\d{2}-\d{2}T").unwrap().is_match(record) {
        return Some(LogFormat::Jdk8);
    }
    None
}

#[test]
fn test_detect_gc_family() {
    let (f, shown) =
        detect_gc_family("2020-01-01T00:00:00.000+0000: [GC [PSYoungGen: 1K->0K(2K)]").unwrap();
    assert_eq!(f, GcFamily::Parallel);
    assert!(shown.ends_with("[PSYoungGen"));

    assert_eq!(
        detect_gc_family("[2020-01-01T00:00:00.000+0000] Using Parallel").unwrap().0,
        GcFamily::Parallel
    );
    assert_eq!(
        detect_gc_family("2020-01-01T00:00:00.000+0000: [GC [ParNew: 1K->0K(2K)]").unwrap().0,
        GcFamily::Cms
    );
    assert_eq!(
        detect_gc_family("...: [GC pause (G1 Evacuation Pause) (young)").unwrap().0,
        GcFamily::G1
    );
    assert_eq!(
        detect_gc_family("...: [Pause Init Mark, 1.2 ms]").unwrap().0,
        GcFamily::Shenandoah
    );
    assert_eq!(
        detect_gc_family("[0.005s] Using Shenandoah").unwrap().0,
        GcFamily::Shenandoah
    );
    assert!(detect_gc_family("no marker tokens here").is_none());
}

#[test]
fn test_detect_gc_family_probe_order() {
    // Earlier probes win when several tokens are present.
    let rec = "x [PSYoungGen y [ParNew z";
    assert_eq!(detect_gc_family(rec).unwrap().0, GcFamily::Parallel);
}

#[test]
fn test_detect_log_format() {
    assert_eq!(
        detect_log_format("2020-01-01T00:00:00.000+0000: [GC"),
        Some(LogFormat::Jdk8)
    );
    assert_eq!(
        detect_log_format("[2020-01-01T00:00:00.000+0000][info][gc] GC(0)"),
        Some(LogFormat::Jdk9)
    );
    assert_eq!(detect_log_format("Heap after GC invocations=1"), None);
}
