// Shared regex fragments for the per-collector parser strategies.

// The date-time fragment that opens every record, captured for timestamp
// normalization.  The numeric zone suffix is matched by the callers and then
// ignored; the fragment is canonicalized as UTC.
pub(crate) const TIMESTAMP: &str = r"(?P<ts>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3})";

// JDK8-era pause trailer, fractional seconds.
pub(crate) const PAUSE_SECS: &str = r", (?P<pause>\d+\.\d+) secs\]";

// JDK9-era (unified logging) pause value, already in milliseconds.
pub(crate) const PAUSE_MS: &str = r"(?P<pause>\d+\.\d+)ms";

// CPU accounting trailer printed by the JDK8-era collectors.
pub(crate) const TIMES: &str =
    r"\[Times: user=(?P<user>\d+\.\d+) sys=(?P<sys>\d+\.\d+), real=(?P<real>\d+\.\d+) secs\]";

// before->after(max) occupancy triple with whole-number sizes and a unit suffix.
pub(crate) const HEAP_SUFFIXED: &str =
    r"(?P<before>\d+[KMG])->(?P<after>\d+[KMG])\((?P<max>\d+[KMG])\)";
