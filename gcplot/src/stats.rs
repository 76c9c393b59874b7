/// Summary-statistics output: allocation volume and the pause distribution
/// for the whole run.
use anyhow::Result;
use gclog::{round3, SeriesAggregator};
use std::io::Write;

const PERCENTILES: [f64; 11] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 0.95, 0.99];

pub fn print_summary(out: &mut impl Write, agg: &mut SeriesAggregator) -> Result<()> {
    writeln!(
        out,
        "Total allocated: {} bytes",
        agg.stats.total_allocated_bytes()
    )?;
    writeln!(out, "Pauses: {}", agg.stats.pause_count())?;
    if agg.stats.pause_count() == 0 {
        return Ok(());
    }
    writeln!(out, "Mean pause: {} ms", round3(agg.stats.mean_pause_ms()))?;
    for p in PERCENTILES {
        writeln!(
            out,
            "p{}: {} ms",
            (p * 100.0).round(),
            agg.stats.percentile(p)?
        )?;
    }
    Ok(())
}

#[test]
fn test_summary() {
    use gclog::{GcEvent, GcKind};
    let mut agg = SeriesAggregator::new();
    for (i, pause) in [10.0, 20.0, 30.0, 40.0].iter().enumerate() {
        let mut e = GcEvent::new(GcKind::MinorGc, i as i64 * 1000);
        e.pause_ms = Some(*pause);
        agg.record(&e);
    }
    let mut buf = Vec::new();
    print_summary(&mut buf, &mut agg).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("Total allocated: 0 bytes"));
    assert!(text.contains("Pauses: 4"));
    assert!(text.contains("Mean pause: 25 ms"));
    assert!(text.contains("p50: 30 ms"));
    assert!(text.contains("p99: 40 ms"));
}

#[test]
fn test_summary_without_pauses() {
    let mut agg = SeriesAggregator::new();
    let mut buf = Vec::new();
    print_summary(&mut buf, &mut agg).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("Pauses: 0"));
    assert!(!text.contains("Mean"));
}
