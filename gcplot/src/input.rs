/// Input handling.  Logs are frequently rotated and compressed in place, so
/// a `.gz` name is decompressed transparently; anything else is read as
/// plain text.  Multi-member gzip files (from concatenated rotations) are
/// read to the end, not just to the first member boundary.
use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};

pub fn open_log(filename: &str) -> Result<Box<dyn BufRead>> {
    let file = File::open(filename).with_context(|| format!("Cannot open {filename}"))?;
    if filename.ends_with(".gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

#[test]
fn test_open_plain() {
    use std::io::Write;
    let dir = std::env::temp_dir();
    let path = dir.join("gcplot_input_test.log");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "hello").unwrap();
    let mut input = open_log(path.to_str().unwrap()).unwrap();
    let mut line = String::new();
    input.read_line(&mut line).unwrap();
    assert_eq!(line, "hello\n");
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_open_missing() {
    assert!(open_log("/no/such/file.log").is_err());
}
