/// `gcplot` -- turn GC log files into chart data and summary statistics
///
/// The input is a JVM GC log (Parallel, CMS, G1 or Shenandoah, classic or
/// unified logging) or, with --dotnet, a comma-delimited .NET GC trace.
/// The default mode writes Highcharts-ready JavaScript variables to the
/// output file; --stats prints allocation and pause statistics to stdout
/// instead and needs no output file.
///
/// Quirks
///
/// A .NET trace carries only offsets from the start of the trace, not
/// absolute times, so its points are anchored at the current wall-clock
/// time; the shape of the chart is right but the absolute positions are
/// not meaningful.
mod chart;
mod input;
mod stats;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Parser;
use gclog::GcFamily;
use std::fs::File;
use std::io::{self, BufWriter};
use std::process;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Force the collector family (Parallel, CMS, G1 or Shenandoah) instead
    /// of probing the first record
    #[arg(long, value_parser = parse_family)]
    gc: Option<GcFamily>,

    /// The input is a comma-delimited .NET GC trace
    #[arg(long)]
    dotnet: bool,

    /// Print summary statistics to stdout instead of writing chart data
    #[arg(long)]
    stats: bool,

    /// Print detection diagnostics to stderr
    #[arg(long, short)]
    verbose: bool,

    /// GC log file; a .gz suffix selects transparent decompression
    logfile: String,

    /// Chart data output file (required unless --stats)
    output: Option<String>,
}

fn parse_family(s: &str) -> Result<GcFamily, String> {
    match s {
        "Parallel" => Ok(GcFamily::Parallel),
        "CMS" => Ok(GcFamily::Cms),
        "G1" => Ok(GcFamily::G1),
        "Shenandoah" => Ok(GcFamily::Shenandoah),
        _ => Err(format!(
            "Unknown GC family {s}, expected Parallel, CMS, G1 or Shenandoah"
        )),
    }
}

fn main() {
    match gcplot() {
        Ok(()) => {}
        Err(msg) => {
            eprintln!("ERROR: {}", msg);
            process::exit(1);
        }
    }
}

fn gcplot() -> Result<()> {
    let cli = Cli::parse();
    let input = input::open_log(&cli.logfile)?;

    if cli.dotnet {
        let mut agg = gclog::scan_trace(input, Utc::now().timestamp_millis())?;
        if cli.stats {
            return stats::print_summary(&mut io::stdout(), &mut agg);
        }
        let mut out = open_output(&cli.output)?;
        return chart::write_trace_chart(&mut out, &agg);
    }

    let mut result = gclog::scan_log(input, cli.gc, cli.verbose)?;
    if cli.stats {
        return stats::print_summary(&mut io::stdout(), &mut result.agg);
    }
    let mut out = open_output(&cli.output)?;
    chart::write_jvm_chart(&mut out, result.family, &result.agg)
}

fn open_output(output: &Option<String>) -> Result<BufWriter<File>> {
    match output {
        Some(filename) => Ok(BufWriter::new(File::create(filename)?)),
        None => bail!("An output file is required unless --stats is given"),
    }
}

#[test]
fn test_parse_family() {
    assert_eq!(parse_family("G1").unwrap(), GcFamily::G1);
    assert_eq!(parse_family("CMS").unwrap(), GcFamily::Cms);
    assert!(parse_family("Zgc").is_err());
}

#[test]
fn test_cli_shapes() {
    let cli = Cli::parse_from(["gcplot", "--gc", "G1", "-v", "app.log", "data.js"]);
    assert_eq!(cli.gc, Some(GcFamily::G1));
    assert!(cli.verbose);
    assert_eq!(cli.logfile, "app.log");
    assert_eq!(cli.output.as_deref(), Some("data.js"));

    let cli = Cli::parse_from(["gcplot", "--dotnet", "--stats", "trace.csv"]);
    assert!(cli.dotnet);
    assert!(cli.stats);
    assert!(cli.output.is_none());
}
