use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::Range;

use bio_types::strand::ReqStrand;
use itertools::Itertools;
use rust_htslib::bam;
use rust_htslib::bam::record::{Cigar, CigarString};

pub mod flags {
    pub const PAIRED: u16 = 0x1;
    pub const PROPER_PAIR: u16 = 0x2;
    pub const UNMAPPED: u16 = 0x4;
    pub const MATE_UNMAPPED: u16 = 0x8;
    pub const REVERSE: u16 = 0x10;
    pub const MATE_REVERSE: u16 = 0x20;
    pub const FIRST_IN_TEMPLATE: u16 = 0x40;
    pub const LAST_IN_TEMPLATE: u16 = 0x80;
    pub const SECONDARY: u16 = 0x100;
    pub const SUPPLEMENTARY: u16 = 0x800;
}

/// 0-based position on a named chromosome.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Placement {
    pub contig: String,
    pub pos: u64,
}

impl Placement {
    pub fn new(contig: impl Into<String>, pos: u64) -> Self {
        Self { contig: contig.into(), pos }
    }
}

impl Display for Placement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contig, self.pos + 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordRole {
    Primary,
    Secondary,
    Supplementary,
}

/// Value copy of the mate placement as seen from the record itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MateSummary {
    pub placement: Option<Placement>,
    pub cigar: Option<CigarString>,
}

/// One entry of the supplementary alignment (SA) list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlternateAlignment {
    pub placement: Placement,
    pub strand: ReqStrand,
    pub cigar: CigarString,
    pub mapq: u8,
    pub nm: u32,
}

impl AlternateAlignment {
    pub fn span(&self) -> Range<u64> {
        self.placement.pos..self.placement.pos + reference_len(&self.cigar).max(1)
    }

    /// Parses "rname,pos,strand,CIGAR,mapq,NM;" segments. Returns None on any malformed segment.
    pub fn parse_list(text: &str) -> Option<Vec<AlternateAlignment>> {
        text.split_terminator(';').filter(|x| !x.is_empty()).map(AlternateAlignment::parse).collect()
    }

    fn parse(segment: &str) -> Option<AlternateAlignment> {
        let fields = segment.split(',').collect_vec();
        if fields.len() != 6 {
            return None;
        }
        let (placement, strand) = parse_placement(&fields)?;
        Some(AlternateAlignment {
            placement,
            strand,
            cigar: CigarString::try_from(fields[3].as_bytes()).ok()?,
            mapq: fields[4].parse().ok()?,
            nm: fields[5].parse().ok()?,
        })
    }
}

impl Display for AlternateAlignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{};",
            self.placement.contig,
            self.placement.pos + 1,
            strand_symbol(self.strand),
            self.cigar,
            self.mapq,
            self.nm
        )
    }
}

/// Placement of the record before it was unmapped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OriginalAlignment {
    pub placement: Placement,
    pub strand: ReqStrand,
    pub cigar: CigarString,
    pub mapq: u8,
}

impl OriginalAlignment {
    /// First entry of an OA tag, "rname,pos,strand,CIGAR,mapq,NM;" with an optional NM.
    pub fn parse(text: &str) -> Option<OriginalAlignment> {
        let fields = text.split_terminator(';').next()?.split(',').collect_vec();
        if fields.len() != 6 {
            return None;
        }
        let (placement, strand) = parse_placement(&fields)?;
        Some(OriginalAlignment {
            placement,
            strand,
            cigar: CigarString::try_from(fields[3].as_bytes()).ok()?,
            mapq: fields[4].parse().ok()?,
        })
    }
}

impl Display for OriginalAlignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},;",
            self.placement.contig,
            self.placement.pos + 1,
            strand_symbol(self.strand),
            self.cigar,
            self.mapq
        )
    }
}

/// Placement of the mate before it was unmapped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OriginalMate {
    pub placement: Placement,
    pub strand: ReqStrand,
}

impl OriginalMate {
    /// First entry of an OM tag, "rname,pos,strand;".
    pub fn parse(text: &str) -> Option<OriginalMate> {
        let fields = text.split_terminator(';').next()?.split(',').collect_vec();
        if fields.len() != 3 {
            return None;
        }
        let (placement, strand) = parse_placement(&fields)?;
        Some(OriginalMate { placement, strand })
    }
}

impl Display for OriginalMate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{};", self.placement.contig, self.placement.pos + 1, strand_symbol(self.strand))
    }
}

#[derive(Clone, Debug)]
pub struct AlignedRecord {
    pub name: Vec<u8>,
    pub flags: u16,
    pub placement: Option<Placement>,
    pub cigar: CigarString,
    pub mapq: u8,
    pub mate: MateSummary,
    pub insert_size: i64,
    pub alternates: Vec<AlternateAlignment>,
    pub original: Option<OriginalAlignment>,
    pub original_mate: Option<OriginalMate>,
    /// Auxiliary data (SA/MC) was present but could not be parsed.
    pub malformed: bool,
    // Source record carrying sequence, qualities and unrelated tags
    pub(crate) template: Option<bam::Record>,
}

impl AlignedRecord {
    pub fn new(name: &[u8], flags: u16) -> Self {
        Self {
            name: name.to_vec(),
            flags,
            placement: None,
            cigar: CigarString(vec![]),
            mapq: 0,
            mate: MateSummary::default(),
            insert_size: 0,
            alternates: vec![],
            original: None,
            original_mate: None,
            malformed: false,
            template: None,
        }
    }

    pub fn role(&self) -> RecordRole {
        if self.has(flags::SUPPLEMENTARY) {
            RecordRole::Supplementary
        } else if self.has(flags::SECONDARY) {
            RecordRole::Secondary
        } else {
            RecordRole::Primary
        }
    }

    #[inline]
    pub fn has(&self, flag: u16) -> bool {
        self.flags & flag != 0
    }

    #[inline]
    pub fn set(&mut self, flag: u16, value: bool) {
        if value {
            self.flags |= flag
        } else {
            self.flags &= !flag
        }
    }

    pub fn is_paired(&self) -> bool {
        self.has(flags::PAIRED)
    }

    pub fn is_unmapped(&self) -> bool {
        self.has(flags::UNMAPPED) || self.placement.is_none()
    }

    pub fn is_mate_unmapped(&self) -> bool {
        self.has(flags::MATE_UNMAPPED) || self.mate.placement.is_none()
    }

    pub fn strand(&self) -> ReqStrand {
        if self.has(flags::REVERSE) {
            ReqStrand::Reverse
        } else {
            ReqStrand::Forward
        }
    }

    pub fn mate_strand(&self) -> ReqStrand {
        if self.has(flags::MATE_REVERSE) {
            ReqStrand::Reverse
        } else {
            ReqStrand::Forward
        }
    }

    /// Reference span covered by the record. Unmapped records that are still placed cover one base.
    pub fn span(&self) -> Option<Range<u64>> {
        let placement = self.placement.as_ref()?;
        let len = if self.has(flags::UNMAPPED) { 1 } else { reference_len(&self.cigar).max(1) };
        Some(placement.pos..placement.pos + len)
    }

    /// Reference span of the mate. Without a mate CIGAR the record's own length is used.
    pub fn mate_span(&self) -> Option<Range<u64>> {
        if self.has(flags::MATE_UNMAPPED) {
            return None;
        }
        let placement = self.mate.placement.as_ref()?;
        let len = match &self.mate.cigar {
            Some(cigar) => reference_len(cigar),
            None => reference_len(&self.cigar),
        };
        Some(placement.pos..placement.pos + len.max(1))
    }

    pub fn clipped(&self) -> u64 {
        clipped_len(&self.cigar)
    }

    pub fn mate_clipped(&self) -> Option<u64> {
        self.mate.cigar.as_ref().map(clipped_len)
    }

    pub fn end(&self) -> Option<u64> {
        self.span().map(|x| x.end)
    }
}

pub fn reference_len(cigar: &CigarString) -> u64 {
    cigar
        .0
        .iter()
        .map(|op| match op {
            Cigar::Match(l) | Cigar::Del(l) | Cigar::RefSkip(l) | Cigar::Equal(l) | Cigar::Diff(l) => *l as u64,
            _ => 0,
        })
        .sum()
}

pub fn clipped_len(cigar: &CigarString) -> u64 {
    cigar
        .0
        .iter()
        .map(|op| match op {
            Cigar::SoftClip(l) | Cigar::HardClip(l) => *l as u64,
            _ => 0,
        })
        .sum()
}

// Leading "rname,pos,strand" fields shared by the SA, OA and OM tags, pos is 1-based
fn parse_placement(fields: &[&str]) -> Option<(Placement, ReqStrand)> {
    let pos = fields.get(1)?.parse::<u64>().ok()?.checked_sub(1)?;
    let strand = match *fields.get(2)? {
        "+" => ReqStrand::Forward,
        "-" => ReqStrand::Reverse,
        _ => return None,
    };
    Some((Placement::new(*fields.first()?, pos), strand))
}

fn strand_symbol(strand: ReqStrand) -> char {
    match strand {
        ReqStrand::Forward => '+',
        ReqStrand::Reverse => '-',
    }
}
