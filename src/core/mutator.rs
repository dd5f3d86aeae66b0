use rust_htslib::bam::record::CigarString;

use super::read::{flags, AlignedRecord, OriginalAlignment, OriginalMate};

/// In-place rewrites applied once a record or its mate is unmapped.
///
/// None of the operations can fail: absent data (e.g. no mate placement) simply leaves the
/// corresponding fields unknown.
pub struct RecordMutator;

impl RecordMutator {
    pub fn unmap_read(record: &mut AlignedRecord, mate_also_unmapped: bool, mate_being_unmapped: bool) {
        Self::clear_alignment(record);

        if mate_also_unmapped || !record.is_paired() {
            record.placement = None;
        } else {
            // Keep the pair co-located for downstream tools
            record.placement = record.mate.placement.clone();
            if mate_being_unmapped {
                record.mate.placement = None;
            }
        }
    }

    pub fn unmap_mate(record: &mut AlignedRecord, read_already_unmapped: bool, read_being_unmapped: bool) {
        if !record.has(flags::MATE_UNMAPPED) {
            if let Some(placement) = record.mate.placement.clone() {
                record.original_mate = Some(OriginalMate { placement, strand: record.mate_strand() });
            }
        }

        record.set(flags::MATE_UNMAPPED, true);
        record.set(flags::PROPER_PAIR, false);
        record.insert_size = 0;
        record.mate.cigar = None;
        record.mate.placement =
            if read_already_unmapped || read_being_unmapped { None } else { record.placement.clone() };
    }

    /// Same clearing as for unmapped reads, the record itself is not emitted afterwards.
    pub fn drop_supplementary(record: &mut AlignedRecord) {
        Self::clear_alignment(record);
        record.placement = None;
    }

    pub fn clear_alternate_alignments(record: &mut AlignedRecord) {
        record.alternates.clear();
    }

    fn clear_alignment(record: &mut AlignedRecord) {
        if !record.has(flags::UNMAPPED) {
            if let Some(placement) = record.placement.clone() {
                record.original = Some(OriginalAlignment {
                    placement,
                    strand: record.strand(),
                    cigar: record.cigar.clone(),
                    mapq: record.mapq,
                });
            }
        }

        record.set(flags::UNMAPPED, true);
        record.set(flags::SECONDARY, false);
        record.set(flags::PROPER_PAIR, false);
        record.mapq = 0;
        record.insert_size = 0;
        record.cigar = CigarString(vec![]);
        record.alternates.clear();
    }
}
