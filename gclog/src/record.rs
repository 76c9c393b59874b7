/// Reassembly of physical log lines into logical GC records.
///
/// A GC record may span several physical lines: heap breakdowns, reference
/// processing sub-reports and wrapped detail lines all belong to the record
/// opened by the most recent timestamped line.  A line starts a new record if
/// and only if it begins with the date-time prefix (bracketed or not) and is
/// not a soft-reference sub-report -- those are timestamp-prefixed but are
/// continuations of the record being accumulated.
///
/// NOTE: the assembler only emits a record when it sees the start of the next
/// one, so the caller must invoke `finish()` at end of stream to obtain the
/// final record.
use regex::Regex;

const SOFT_REFERENCE_MARKER: &str = "[SoftReference,";

pub struct RecordAssembler {
    start_re: Regex,
    buf: String,
}

impl RecordAssembler {
    pub fn new() -> RecordAssembler {
        RecordAssembler {
            start_re: Regex::new(r"^(\d{4}|\[\d{4})-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}")
                .unwrap(),
            buf: String::new(),
        }
    }

    /// Feed one physical line (without its terminator).  Returns the previous
    /// record when `line` opens a new one, None while still accumulating.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        let mut completed = None;
        if self.start_re.is_match(line) && !line.contains(SOFT_REFERENCE_MARKER) {
            if !self.buf.is_empty() {
                completed = Some(std::mem::take(&mut self.buf));
            }
        }
        self.buf.push_str(line);
        self.buf.push('\n');
        completed
    }

    /// Flush the record still being accumulated at end of stream.
    pub fn finish(mut self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn test_two_records() {
    let mut asm = RecordAssembler::new();
    assert!(asm.push_line("2020-01-01T00:00:00.000+0000: 0.1: [GC pause]").is_none());
    let first = asm
        .push_line("2020-01-01T00:00:01.000+0000: 1.1: [GC pause]")
        .unwrap();
    assert_eq!(first, "2020-01-01T00:00:00.000+0000: 0.1: [GC pause]\n");
    let last = asm.finish().unwrap();
    assert_eq!(last, "2020-01-01T00:00:01.000+0000: 1.1: [GC pause]\n");
}

#[test]
fn test_continuation_lines() {
    let mut asm = RecordAssembler::new();
    assert!(asm.push_line("2020-01-01T00:00:00.000+0000: [GC pause (young)").is_none());
    assert!(asm.push_line("   [Eden: 1024.0K(1024.0K)->0.0B(1024.0K)]").is_none());
    assert!(asm.push_line(" Heap: 30.0M(100.0M)->10.0M(100.0M)").is_none());
    let rec = asm.finish().unwrap();
    assert!(rec.contains("[GC pause (young)\n"));
    assert!(rec.contains("Eden"));
    assert!(rec.contains("Heap:"));
}

#[test]
fn test_soft_reference_is_continuation() {
    // The sub-report line carries its own timestamp prefix but belongs to the
    // record above it.
    let mut asm = RecordAssembler::new();
    assert!(asm.push_line("2020-01-01T00:00:00.000+0000: [GC pause (young)").is_none());
    assert!(asm
        .push_line("2020-01-01T00:00:00.010+0000: [SoftReference, 0 refs, 0.0000 secs]")
        .is_none());
    let rec = asm
        .push_line("2020-01-01T00:00:02.000+0000: [GC pause (young)")
        .unwrap();
    assert!(rec.contains("[SoftReference,"));
    assert!(asm.finish().is_some());
}

#[test]
fn test_bracketed_prefix_starts_record() {
    let mut asm = RecordAssembler::new();
    assert!(asm.push_line("[2020-01-01T00:00:00.000+0000] GC(0) Pause Young").is_none());
    assert!(asm
        .push_line("[2020-01-01T00:00:01.000+0000] GC(1) Pause Young")
        .is_some());
}

#[test]
fn test_empty_stream() {
    let asm = RecordAssembler::new();
    assert!(asm.finish().is_none());
}

#[test]
fn test_leading_untimestamped_lines_form_first_record() {
    let mut asm = RecordAssembler::new();
    assert!(asm.push_line("OpenJDK 64-Bit Server VM warning").is_none());
    let first = asm
        .push_line("2020-01-01T00:00:00.000+0000: [GC pause]")
        .unwrap();
    assert_eq!(first, "OpenJDK 64-Bit Server VM warning\n");
}
