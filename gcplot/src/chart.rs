/// Chart-data output: one `var data_serie_<name> = [...]` JavaScript
/// variable per series, followed by a `var series = [...]` legend describing
/// the pause series that actually have data.  The variables feed a
/// Highcharts page; millisecond pauses go on axis 0 and the long
/// full-collection pauses on axis 1, in seconds.
///
/// Every known series variable for the collector family is emitted even when
/// empty, so the consuming page can reference them unconditionally; the
/// legend lists only the non-empty ones.
use anyhow::Result;
use gclog::{GcFamily, SeriesAggregator, SeriesId};
use std::io::Write;

// Series variables common to every JVM collector, in emission order.
const JVM_BASE_VARS: [SeriesId; 7] = [
    SeriesId::HeapOccupancy,
    SeriesId::MaxHeap,
    SeriesId::MinorGc,
    SeriesId::FullGc,
    SeriesId::CpuUser,
    SeriesId::CpuSys,
    SeriesId::CpuReal,
];

const TRACE_VARS: [SeriesId; 9] = [
    SeriesId::HeapGen0,
    SeriesId::HeapGen1,
    SeriesId::HeapGen2,
    SeriesId::HeapLoh,
    SeriesId::HeapTotal,
    SeriesId::PauseGen0,
    SeriesId::PauseGen1,
    SeriesId::PauseInitialMark,
    SeriesId::PauseFinalMark,
];

// Family-specific series variables, in emission order.
fn family_vars(family: GcFamily) -> &'static [SeriesId] {
    match family {
        GcFamily::Parallel => &[],
        GcFamily::Cms => &[SeriesId::InitialMark, SeriesId::FinalRemark],
        GcFamily::G1 => &[
            SeriesId::InitialMark,
            SeriesId::FinalRemark,
            SeriesId::Cleanup,
            SeriesId::Mixed,
        ],
        GcFamily::Shenandoah => &[
            SeriesId::InitMark,
            SeriesId::FinalMark,
            SeriesId::InitUpdate,
            SeriesId::FinalUpdate,
            SeriesId::FinalEvac,
            SeriesId::Degenerated,
        ],
    }
}

// Legend entries per family: display name, series, and whether the values
// are plotted in seconds on the second axis.
fn family_legend(family: GcFamily) -> &'static [(&'static str, SeriesId, bool)] {
    match family {
        GcFamily::Parallel => &[
            ("minor GC", SeriesId::MinorGc, false),
            ("Full GC", SeriesId::FullGc, true),
        ],
        GcFamily::Cms => &[
            ("minor GC", SeriesId::MinorGc, false),
            ("initial mark", SeriesId::InitialMark, false),
            ("final remark", SeriesId::FinalRemark, false),
            ("Full GC", SeriesId::FullGc, true),
        ],
        GcFamily::G1 => &[
            ("minor GC", SeriesId::MinorGc, false),
            ("mixed", SeriesId::Mixed, false),
            ("initial mark", SeriesId::InitialMark, false),
            ("final remark", SeriesId::FinalRemark, false),
            ("cleanup", SeriesId::Cleanup, false),
            ("Full GC", SeriesId::FullGc, true),
        ],
        GcFamily::Shenandoah => &[
            ("Init Mark", SeriesId::InitMark, false),
            ("Final Mark", SeriesId::FinalMark, false),
            ("Init Update", SeriesId::InitUpdate, false),
            ("Final Update", SeriesId::FinalUpdate, false),
            ("Final Evac", SeriesId::FinalEvac, false),
            ("Degenerated GC", SeriesId::Degenerated, true),
        ],
    }
}

fn write_series_var(out: &mut impl Write, agg: &SeriesAggregator, id: SeriesId) -> Result<()> {
    write!(out, "var data_serie_{} = [", id.var_name())?;
    for (t, v) in agg.series(id) {
        write!(out, "[{t},{v}],\n")?;
    }
    writeln!(out, "]")?;
    Ok(())
}

fn legend_entry(name: &str, id: SeriesId, in_seconds: bool) -> String {
    let (suffix, axis) = if in_seconds { ("s", 1) } else { ("ms", 0) };
    format!(
        "\n        {{\n            name: '{}',\n            tooltip: {{\n                valueSuffix: '{}'\n            }},\n            data: data_serie_{},\n            yAxis: {}\n        }}",
        name,
        suffix,
        id.var_name(),
        axis
    )
}

fn write_legend(
    out: &mut impl Write,
    agg: &SeriesAggregator,
    legend: &[(&str, SeriesId, bool)],
) -> Result<()> {
    let entries = legend
        .iter()
        .filter(|(_, id, _)| !agg.series(*id).is_empty())
        .map(|(name, id, in_seconds)| legend_entry(name, *id, *in_seconds))
        .collect::<Vec<String>>();
    writeln!(out, "var series = [{}]", entries.join(", "))?;
    Ok(())
}

/// Emit the chart data for a JVM log scan.
pub fn write_jvm_chart(
    out: &mut impl Write,
    family: GcFamily,
    agg: &SeriesAggregator,
) -> Result<()> {
    for id in JVM_BASE_VARS {
        write_series_var(out, agg, id)?;
    }
    for id in family_vars(family) {
        write_series_var(out, agg, *id)?;
    }
    write_legend(out, agg, family_legend(family))?;
    // The caller hands us a buffered writer; flush here so a short write
    // (full disk) fails the run instead of being swallowed on drop.
    out.flush()?;
    Ok(())
}

/// Emit the chart data for a .NET trace scan.  The consuming page builds its
/// own legend from the per-generation variables, so the legend is empty.
pub fn write_trace_chart(out: &mut impl Write, agg: &SeriesAggregator) -> Result<()> {
    for id in TRACE_VARS {
        write_series_var(out, agg, id)?;
    }
    writeln!(out, "var series = []")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
fn sample_agg() -> SeriesAggregator {
    use gclog::{GcEvent, GcKind};
    let mut agg = SeriesAggregator::new();
    let mut e = GcEvent::new(GcKind::MinorGc, 1000);
    e.heap_before_gb = Some(2.0);
    e.heap_after_gb = Some(0.5);
    e.after_offset_ms = 25;
    e.pause_ms = Some(25.0);
    agg.record(&e);
    agg
}

#[test]
fn test_series_var_format() {
    let agg = sample_agg();
    let mut buf = Vec::new();
    write_series_var(&mut buf, &agg, SeriesId::HeapOccupancy).unwrap();
    assert_eq!(
        String::from_utf8(buf).unwrap(),
        "var data_serie_heap = [[1000,2],\n[1025,0.5],\n]\n"
    );
}

#[test]
fn test_empty_series_var() {
    let agg = SeriesAggregator::new();
    let mut buf = Vec::new();
    write_series_var(&mut buf, &agg, SeriesId::FullGc).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "var data_serie_fullgc = []\n");
}

#[test]
fn test_legend_lists_only_populated_series() {
    let agg = sample_agg();
    let mut buf = Vec::new();
    write_legend(&mut buf, &agg, family_legend(GcFamily::Parallel)).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("name: 'minor GC'"));
    assert!(text.contains("valueSuffix: 'ms'"));
    assert!(text.contains("yAxis: 0"));
    assert!(!text.contains("Full GC"));
}

#[test]
fn test_full_gc_legend_axis() {
    use gclog::{GcEvent, GcKind};
    let mut agg = SeriesAggregator::new();
    let mut e = GcEvent::new(GcKind::FullGc, 1000);
    e.pause_ms = Some(1500.0);
    agg.record(&e);
    let mut buf = Vec::new();
    write_legend(&mut buf, &agg, family_legend(GcFamily::Parallel)).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("name: 'Full GC'"));
    assert!(text.contains("valueSuffix: 's'"));
    assert!(text.contains("yAxis: 1"));
}

#[test]
fn test_jvm_chart_emits_all_family_vars() {
    let agg = SeriesAggregator::new();
    let mut buf = Vec::new();
    write_jvm_chart(&mut buf, GcFamily::Shenandoah, &agg).unwrap();
    let text = String::from_utf8(buf).unwrap();
    for name in [
        "heap", "heapmax", "minorgc", "fullgc", "user", "sys", "real", "init_mark",
        "final_mark", "init_update", "final_update", "final_evac", "degenerated",
    ] {
        assert!(text.contains(&format!("var data_serie_{name} = [")), "{name}");
    }
    assert!(text.contains("var series = []"));
}

#[test]
fn test_flush_failure_is_an_error() {
    struct FullDisk;
    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "no space left on device",
            ))
        }
    }
    let agg = SeriesAggregator::new();
    assert!(write_jvm_chart(&mut FullDisk, GcFamily::Parallel, &agg).is_err());
    assert!(write_trace_chart(&mut FullDisk, &agg).is_err());
}

#[test]
fn test_trace_chart() {
    let agg = SeriesAggregator::new();
    let mut buf = Vec::new();
    write_trace_chart(&mut buf, &agg).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("var data_serie_heap_gen0 = []"));
    assert!(text.contains("var data_serie_heap_gen3 = []"));
    assert!(text.contains("var data_serie_pause_finalmark = []"));
    assert!(text.ends_with("var series = []\n"));
}
