use derive_more::Constructor;
use serde::Serialize;

use super::params::RemapParams;
use super::read::{clipped_len, AlignedRecord, AlternateAlignment};
use super::regions::RegionMatchType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum UnmapReason {
    None,
    HighDepth,
    SoftClip,
    Chimeric,
}

impl UnmapReason {
    pub fn is_none(&self) -> bool {
        *self == UnmapReason::None
    }
}

/// Stateless classification of reads, mates and alternate alignments.
#[derive(Constructor, Copy, Clone, Debug)]
pub struct UnmapDecision {
    soft_clip: u32,
    max_insert: u64,
}

impl From<&RemapParams> for UnmapDecision {
    fn from(params: &RemapParams) -> Self {
        Self::new(*params.soft_clip(), *params.max_insert())
    }
}

impl UnmapDecision {
    pub fn decide_for_read(&self, record: &AlignedRecord, matched: RegionMatchType) -> UnmapReason {
        match matched {
            RegionMatchType::None => UnmapReason::None,
            RegionMatchType::HighDepth => UnmapReason::HighDepth,
            RegionMatchType::Other => {
                if record.clipped() >= self.soft_clip as u64 {
                    UnmapReason::SoftClip
                } else if record.is_paired() && self.is_chimeric(record) {
                    UnmapReason::Chimeric
                } else {
                    UnmapReason::None
                }
            }
        }
    }

    pub fn decide_for_mate(&self, record: &AlignedRecord, matched: RegionMatchType) -> bool {
        match matched {
            RegionMatchType::None => false,
            RegionMatchType::HighDepth => true,
            RegionMatchType::Other => {
                self.is_chimeric(record) || record.mate_clipped().map_or(false, |x| x >= self.soft_clip as u64)
            }
        }
    }

    pub fn decide_for_alternate(&self, alt: &AlternateAlignment, matched: RegionMatchType) -> bool {
        match matched {
            RegionMatchType::None => false,
            RegionMatchType::HighDepth => true,
            RegionMatchType::Other => clipped_len(&alt.cigar) >= self.soft_clip as u64,
        }
    }

    /// Mate unmapped, on another chromosome, on the same strand, or too far away.
    pub fn is_chimeric(&self, record: &AlignedRecord) -> bool {
        if record.is_mate_unmapped() {
            return true;
        }
        let inter = match (&record.placement, &record.mate.placement) {
            (Some(read), Some(mate)) => read.contig != mate.contig,
            _ => false,
        };
        inter || record.strand() == record.mate_strand() || record.insert_size.unsigned_abs() > self.max_insert
    }
}

#[cfg(test)]
mod tests {
    use bio_types::strand::ReqStrand;
    use rust_htslib::bam::record::CigarString;

    use crate::core::read::{flags, Placement};

    use super::*;

    fn pair(cigar: &str, mate_contig: &str, mate_reverse: bool, insert_size: i64) -> AlignedRecord {
        let mut record = AlignedRecord::new(b"read", flags::PAIRED | flags::FIRST_IN_TEMPLATE);
        record.placement = Some(Placement::new("chr1", 1000));
        record.cigar = CigarString::try_from(cigar).unwrap();
        record.mate.placement = Some(Placement::new(mate_contig, 1200));
        record.set(flags::MATE_REVERSE, mate_reverse);
        record.insert_size = insert_size;
        record
    }

    fn decision() -> UnmapDecision {
        UnmapDecision::new(20, 1000)
    }

    #[test]
    fn read_by_match() {
        let record = pair("100M", "chr1", true, 300);
        assert_eq!(decision().decide_for_read(&record, RegionMatchType::None), UnmapReason::None);
        assert_eq!(decision().decide_for_read(&record, RegionMatchType::HighDepth), UnmapReason::HighDepth);
        assert_eq!(decision().decide_for_read(&record, RegionMatchType::Other), UnmapReason::None);
    }

    #[test]
    fn read_soft_clip() {
        for (cigar, expected) in [
            ("19S81M", UnmapReason::None),
            ("20S80M", UnmapReason::SoftClip),
            ("10S70M10H", UnmapReason::SoftClip),
            ("10H80M9S", UnmapReason::None),
        ] {
            let record = pair(cigar, "chr1", true, 300);
            assert_eq!(decision().decide_for_read(&record, RegionMatchType::Other), expected, "{}", cigar);
        }
        // Soft clipping is checked before the chimeric signals
        let record = pair("30S70M", "chr2", true, 300);
        assert_eq!(decision().decide_for_read(&record, RegionMatchType::Other), UnmapReason::SoftClip);
    }

    #[test]
    fn read_chimeric() {
        let other = RegionMatchType::Other;
        // inter-chromosomal
        assert_eq!(decision().decide_for_read(&pair("100M", "chr2", true, 0), other), UnmapReason::Chimeric);
        // same strand
        assert_eq!(decision().decide_for_read(&pair("100M", "chr1", false, 300), other), UnmapReason::Chimeric);
        // insert size
        assert_eq!(decision().decide_for_read(&pair("100M", "chr1", true, 1000), other), UnmapReason::None);
        assert_eq!(decision().decide_for_read(&pair("100M", "chr1", true, -1001), other), UnmapReason::Chimeric);

        // mate unmapped
        let mut record = pair("100M", "chr1", true, 300);
        record.set(flags::MATE_UNMAPPED, true);
        assert_eq!(decision().decide_for_read(&record, other), UnmapReason::Chimeric);

        // single-end reads are never chimeric
        let mut record = pair("100M", "chr2", false, 5000);
        record.set(flags::PAIRED, false);
        assert_eq!(decision().decide_for_read(&record, other), UnmapReason::None);
    }

    #[test]
    fn mate() {
        let normal = pair("100M", "chr1", true, 300);
        assert!(!decision().decide_for_mate(&normal, RegionMatchType::None));
        assert!(decision().decide_for_mate(&normal, RegionMatchType::HighDepth));
        assert!(!decision().decide_for_mate(&normal, RegionMatchType::Other));

        let chimeric = pair("100M", "chr1", false, 300);
        assert!(decision().decide_for_mate(&chimeric, RegionMatchType::Other));
        assert!(!decision().decide_for_mate(&chimeric, RegionMatchType::None));

        let mut clipped = pair("100M", "chr1", true, 300);
        clipped.mate.cigar = Some(CigarString::try_from("75M25S").unwrap());
        assert!(decision().decide_for_mate(&clipped, RegionMatchType::Other));
        clipped.mate.cigar = Some(CigarString::try_from("95M5S").unwrap());
        assert!(!decision().decide_for_mate(&clipped, RegionMatchType::Other));
    }

    #[test]
    fn alternate() {
        let alt = |cigar: &str| AlternateAlignment {
            placement: Placement::new("chr3", 10),
            strand: ReqStrand::Forward,
            cigar: CigarString::try_from(cigar).unwrap(),
            mapq: 60,
            nm: 0,
        };
        assert!(!decision().decide_for_alternate(&alt("60H40M"), RegionMatchType::None));
        assert!(decision().decide_for_alternate(&alt("100M"), RegionMatchType::HighDepth));
        assert!(decision().decide_for_alternate(&alt("60H40M"), RegionMatchType::Other));
        assert!(!decision().decide_for_alternate(&alt("100M"), RegionMatchType::Other));
    }
}
