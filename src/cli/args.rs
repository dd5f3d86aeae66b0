use clap::Arg;

use super::validate;

pub mod io {
    use super::*;

    pub const INPUT: &str = "input";
    pub const REGIONS: &str = "regions";
    pub const RELOCATED: &str = "relocated";
    pub const UNMAPPED: &str = "unmapped";
    pub const STATS: &str = "stats";

    pub const SECTION_NAME: &str = "Input/Output";

    pub fn args<'a>() -> Vec<Arg<'a>> {
        let args = vec![
            Arg::new(INPUT)
                .short('i')
                .long(INPUT)
                .takes_value(true)
                .required(true)
                .validator(validate::path)
                .long_help("Path to the input coordinate-sorted BAM/CRAM file. The index (.bai/.csi/.crai) must be located next to it."),
            Arg::new(REGIONS)
                .short('r')
                .long(REGIONS)
                .takes_value(true)
                .required(true)
                .validator(validate::path)
                .long_help("BED file (.bed or .bed.gz) with flagged intervals: chromosome, start, end and the observed maximum read depth in the 4th column. Intervals on the same chromosome must not overlap."),
            Arg::new(RELOCATED)
                .long(RELOCATED)
                .takes_value(true)
                .required(true)
                .validator(validate::writable)
                .long_help("Output BAM for rewritten records that keep a placement: unmapped reads moved next to their mapped mate, reads whose mate was unmapped, reads with stripped supplementary alignments. The output is not sorted."),
            Arg::new(UNMAPPED)
                .long(UNMAPPED)
                .takes_value(true)
                .required(true)
                .validator(validate::writable)
                .long_help("Output BAM for records without any placement: both ends of the pair were unmapped, single-end reads were unmapped, or the record was unplaced in the input."),
            Arg::new(STATS)
                .long(STATS)
                .takes_value(true)
                .validator(validate::writable)
                .long_help("Save run statistics (unmapped reads by reason, routed records, anomalies) to the given TSV file."),
        ];
        args.into_iter().map(|x| x.help_heading(Some(SECTION_NAME))).collect()
    }
}

pub mod thresholds {
    use super::*;

    pub const SOFT_CLIP: &str = "soft-clip";
    pub const MIN_DEPTH: &str = "min-depth";
    pub const MAX_INSERT: &str = "max-insert";
    pub const TOLERANCE: &str = "tolerance";
    pub const PADDING: &str = "padding";

    pub const SECTION_NAME: &str = "Thresholds";

    pub fn args<'a>() -> Vec<Arg<'a>> {
        let args = vec![
            Arg::new(MIN_DEPTH)
                .long(MIN_DEPTH)
                .takes_value(true)
                .validator(validate::numeric(0u32, u32::MAX))
                .default_value("200")
                .long_help("Flagged intervals with the maximum depth ≥ threshold are high-depth: every read placed inside them is unmapped."),
            Arg::new(SOFT_CLIP)
                .long(SOFT_CLIP)
                .takes_value(true)
                .validator(validate::numeric(1u32, u32::MAX))
                .default_value("20")
                .long_help("Reads inside the remaining flagged intervals are unmapped when they have ≥ threshold clipped (soft + hard) bases."),
            Arg::new(MAX_INSERT)
                .long(MAX_INSERT)
                .takes_value(true)
                .validator(validate::numeric(1u64, u64::MAX))
                .default_value("1000")
                .long_help("Pairs inside flagged intervals with |insert size| > threshold are considered chimeric and unmapped. Pairs with an unmapped mate, mates on different chromosomes or on the same strand are chimeric as well."),
            Arg::new(TOLERANCE)
                .long(TOLERANCE)
                .takes_value(true)
                .validator(validate::numeric(0u64, u64::MAX))
                .default_value("10")
                .long_help("A read partially overlapping an interval is considered inside when strictly less than this number of its bases fall outside of the interval."),
            Arg::new(PADDING)
                .long(PADDING)
                .takes_value(true)
                .validator(validate::numeric(0u64, u64::MAX))
                .default_value("500")
                .long_help("Margin (bp) added on both sides of each interval when fetching reads from the input."),
        ];
        args.into_iter().map(|x| x.help_heading(Some(SECTION_NAME))).collect()
    }
}

pub mod runtime {
    use super::*;

    pub const THREADS: &str = "threads";
    pub const VERIFY: &str = "verify";

    pub const SECTION_NAME: &str = "Runtime";

    pub fn args<'a>() -> Vec<Arg<'a>> {
        let args = vec![
            Arg::new(THREADS)
                .short('t')
                .long(THREADS)
                .takes_value(true)
                .validator(validate::numeric(1, usize::MAX))
                .default_value("1")
                .long_help("Maximum number of worker threads. Each worker opens its own reader for the input file."),
            Arg::new(VERIFY)
                .long(VERIFY)
                .takes_value(false)
                .long_help("Re-read both outputs after the run and check that every routing decision is reflected exactly once. Discrepancies are reported as warnings."),
        ];
        args.into_iter().map(|x| x.help_heading(Some(SECTION_NAME))).collect()
    }
}

pub fn all<'a>() -> Vec<Arg<'a>> {
    io::args().into_iter().chain(thresholds::args()).chain(runtime::args()).collect()
}
