/// A GC log is a semi-structured log: each *logical record* describes one
/// collector action, but a record may span several physical lines and its
/// shape depends on which collector wrote it (Parallel, CMS, G1 or
/// Shenandoah) and on the log-format era (classic JDK8 output or JDK9+
/// unified logging).  A .NET GC trace is a simpler, comma-delimited cousin
/// handled by its own parser.
///
/// This library has as its fundamental task to turn such a log into
/// uniformly-typed time series and running statistics.  The task breaks down
/// into a number of subtasks:
///
/// - Reassemble physical lines into logical records, including the
///   timestamp-prefixed sub-reports that belong to the preceding record.
///
/// - Detect, once per log and from its first record, the collector family
///   and the log-format era, and select a parsing strategy accordingly.
///
/// - Match each record against the strategy's patterns and extract a
///   normalized measurement: occupancy in gigabytes, pauses in milliseconds,
///   timestamps as UTC epoch milliseconds.
///
/// - Aggregate measurements into named series and into pause/allocation
///   statistics for the whole run.
///
/// Records that match no pattern are dropped silently; collector logs are
/// mostly noise from this library's point of view.  Matched records with
/// malformed fields, and a first record that cannot be classified, are hard
/// errors.
mod cms;
mod dates;
mod detect;
mod dotnet;
mod event;
mod g1;
mod parallel;
mod pattern;
mod record;
mod scan;
mod series;
mod shenandoah;
mod units;

// Timestamps are UTC epoch milliseconds throughout.

pub use dates::epoch_ms_from_fragment;
pub use dates::TimestampMs;

// Line-to-record reassembly.

pub use record::RecordAssembler;

// Collector family and log-format classification.

pub use detect::detect_gc_family;
pub use detect::detect_log_format;
pub use detect::GcFamily;
pub use detect::LogFormat;

// The normalized measurement and the per-collector parsing strategies.

pub use event::create_parser;
pub use event::EventParser;
pub use event::GcEvent;
pub use event::GcKind;

// The .NET trace parser and its sample type.

pub use dotnet::TraceParser;
pub use dotnet::TraceSample;

// Series accumulation and running statistics.

pub use series::RunningStats;
pub use series::SeriesAggregator;
pub use series::SeriesId;

// Whole-stream drivers: lines in, aggregated result out.

pub use scan::scan_log;
pub use scan::scan_trace;
pub use scan::ScanResult;

// Unit conversions, exposed for the presentation layer.

pub use units::bytes_to_gb;
pub use units::bytes_to_mb;
pub use units::round2;
pub use units::round3;
