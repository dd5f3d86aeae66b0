use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::bufread::GzDecoder;

use crate::core::error::{RemapError, Result};
use crate::core::regions::{Flagged, FlaggedInterval, MaxDepth, RegionCatalog};

fn _parse<T: BufRead>(mut reader: T, path: &Path) -> Result<Vec<(String, FlaggedInterval)>> {
    let mut records = Vec::new();
    let error = |line: usize, reason: String| RemapError::RegionsFormat { path: path.to_owned(), line, reason };

    let mut buf = String::new();
    let mut lineid = 0;
    while reader.read_line(&mut buf)? != 0 {
        lineid += 1;
        let line = buf.trim_end();
        if line.is_empty() || line.starts_with('#') || line.starts_with("track") || line.starts_with("browser") {
            buf.clear();
            continue;
        }

        let split: Vec<&str> = line.split('\t').take(4).collect();
        if split.len() < 4 {
            return Err(error(lineid, format!("expected 4 columns (chr, start, end, depth), got {}", split.len())));
        }
        let start: u64 = split[1].parse().map_err(|_| error(lineid, format!("invalid start '{}'", split[1])))?;
        let end: u64 = split[2].parse().map_err(|_| error(lineid, format!("invalid end '{}'", split[2])))?;
        let depth: MaxDepth = split[3].parse().map_err(|_| error(lineid, format!("invalid depth '{}'", split[3])))?;
        if end < start {
            return Err(error(lineid, format!("end {} < start {}", end, start)));
        }

        records.push((split[0].to_owned(), Flagged::new(start..end, depth)));
        buf.clear();
    }
    Ok(records)
}

pub fn parse(bed: impl AsRef<Path>) -> Result<Vec<(String, FlaggedInterval)>> {
    let bed = bed.as_ref();
    let name = bed.file_name().and_then(OsStr::to_str).unwrap_or_default();

    let file = BufReader::new(File::open(bed)?);
    if name.ends_with(".gz") {
        _parse(BufReader::new(GzDecoder::new(file)), bed)
    } else {
        _parse(file, bed)
    }
}

/// Loads flagged intervals from a BED-like file with the max depth in the 4th column.
pub fn load(bed: impl AsRef<Path>) -> Result<RegionCatalog> {
    RegionCatalog::new(parse(bed)?)
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Write};

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::Builder;

    use super::*;

    fn fi(chr: &str, start: u64, end: u64, depth: MaxDepth) -> (String, FlaggedInterval) {
        (chr.to_string(), Flagged::new(start..end, depth))
    }

    fn parse_str(bed: &str) -> Result<Vec<(String, FlaggedInterval)>> {
        _parse(BufReader::new(bed.as_bytes()), Path::new("test.bed"))
    }

    #[test]
    fn empty() {
        assert!(parse_str("").unwrap().is_empty());
    }

    #[test]
    fn correct() {
        let bed = "\
        track name=high-depth\n\
        # comment\n\
        chr1\t10\t20\t500\n\
        \n\
        chr1\t50\t60\t12\tnamed\n\
        MT\t0\t16569\t100000\n";
        let expected = vec![fi("chr1", 10, 20, 500), fi("chr1", 50, 60, 12), fi("MT", 0, 16569, 100000)];
        assert_eq!(parse_str(bed).unwrap(), expected);
    }

    #[test]
    fn malformed() {
        for bed in ["chr1\t10\t20\n", "chr1\tten\t20\t1\n", "chr1\t10\t20\t-1\n", "chr1\t30\t20\t1\n"] {
            match parse_str(bed) {
                Err(RemapError::RegionsFormat { line, .. }) => assert_eq!(line, 1),
                other => panic!("Unexpected result for {:?}: {:?}", bed, other),
            }
        }
    }

    #[test]
    fn gzipped() {
        let file = Builder::new().suffix(".bed.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
        encoder.write_all(b"chr2\t100\t200\t300\nchr2\t0\t50\t1\n").unwrap();
        encoder.finish().unwrap();

        let catalog = load(file.path()).unwrap();
        assert_eq!(catalog.get("chr2"), &[Flagged::new(0..50, 1), Flagged::new(100..200, 300)]);
    }
}
