use std::fmt;
use std::fmt::{Display, Formatter};

use bio_types::genome::Interval;
use log::{debug, trace};

use crate::core::decision::{UnmapDecision, UnmapReason};
use crate::core::error::Result;
use crate::core::io::RecordSource;
use crate::core::mutator::RecordMutator;
use crate::core::params::RemapParams;
use crate::core::read::{flags, AlignedRecord, Placement, RecordRole};
use crate::core::regions::{padded, CatalogCursor, RegionCatalog, RegionMatchType};
use crate::core::stats::UnmapStats;

use super::router::OutputRouter;

/// Read-only state shared by every task of a run.
#[derive(Clone, Copy)]
pub struct TaskContext<'a> {
    pub catalog: &'a RegionCatalog,
    pub params: &'a RemapParams,
    pub router: &'a OutputRouter<'a>,
    pub stats: &'a UnmapStats,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskKind {
    /// Interval `index` of the chromosome inside the catalog
    Interval { contig: String, index: usize },
    /// Records without any placement
    Drain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Slicing,
    Deciding,
    Routed,
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionTask {
    kind: TaskKind,
    state: TaskState,
}

impl RegionTask {
    pub fn interval(contig: impl Into<String>, index: usize) -> Self {
        Self { kind: TaskKind::Interval { contig: contig.into(), index }, state: TaskState::Pending }
    }

    pub fn drain() -> Self {
        Self { kind: TaskKind::Drain, state: TaskState::Pending }
    }

    /// One task per flagged interval followed by the drain task.
    pub fn from_catalog(catalog: &RegionCatalog) -> Vec<Self> {
        catalog.iter().map(|(contig, index, _)| Self::interval(contig, index)).chain([Self::drain()]).collect()
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    fn advance(&mut self, state: TaskState) {
        trace!("Task {}: {:?} -> {:?}", self, self.state, state);
        self.state = state;
    }

    pub fn run(&mut self, source: &mut impl RecordSource, ctx: &TaskContext) -> Result<()> {
        self.advance(TaskState::Slicing);
        match self.kind.clone() {
            TaskKind::Interval { contig, index } => self.run_interval(&contig, index, source, ctx)?,
            TaskKind::Drain => self.run_drain(source, ctx)?,
        }
        self.advance(TaskState::Done);
        ctx.stats.add_tasks(1);
        Ok(())
    }

    fn run_drain(&mut self, source: &mut impl RecordSource, ctx: &TaskContext) -> Result<()> {
        let records = source.unplaced()?;
        self.advance(TaskState::Deciding);

        let mut drained = 0;
        for record in records {
            ctx.router.drain(record?)?;
            drained += 1;
        }
        debug!("Forwarded {} unplaced records", drained);
        ctx.stats.add_drained(drained);
        self.advance(TaskState::Routed);
        Ok(())
    }

    fn run_interval(
        &mut self,
        contig: &str,
        index: usize,
        source: &mut impl RecordSource,
        ctx: &TaskContext,
    ) -> Result<()> {
        let interval = match ctx.catalog.interval(contig, index) {
            Some(x) => x,
            None => {
                debug!("Task {} points outside of the catalog, skipping", self);
                return Ok(());
            }
        };

        let mut cursors = Cursors::new(ctx.catalog, ctx.params);
        let decider = Decider { decision: UnmapDecision::from(ctx.params), ctx };
        let records = source.fetch(&padded(&interval, *ctx.params.padding()))?;
        self.advance(TaskState::Deciding);

        let (mut inspected, mut previous, mut outside) = (0, 0, vec![]);
        for record in records {
            let record = record?;
            let span = match (&record.placement, record.span()) {
                (Some(placement), Some(span)) if placement.contig == contig => span,
                _ => continue,
            };
            if span.start < previous {
                debug!("Unsorted records in {}: {} after {}", self, span.start, previous);
                ctx.stats.add_anomalies(1);
                cursors.reads.reset();
            }
            previous = span.start;

            // Reads fraying into a neighbouring interval are processed by exactly one task
            let matched = match cursors.reads.hit(contig, span) {
                Some((ind, matched)) if ind == index => matched,
                _ => continue,
            };
            inspected += 1;
            outside.extend(decider.process(record, matched, &mut cursors)?);
        }
        decider.outside_mates(outside, source, &mut cursors)?;
        self.advance(TaskState::Routed);

        ctx.stats.add_inspected(inspected);
        ctx.stats.add_cursor_fallbacks(cursors.fallbacks());
        Ok(())
    }
}

impl Display for RegionTask {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TaskKind::Interval { contig, index } => write!(f, "{}#{}", contig, index),
            TaskKind::Drain => write!(f, "drain"),
        }
    }
}

// Reads advance monotonically, mates and alternates jump around: one cursor for each stream
struct Cursors<'a> {
    reads: CatalogCursor<'a>,
    mates: CatalogCursor<'a>,
    alternates: CatalogCursor<'a>,
}

impl<'a> Cursors<'a> {
    fn new(catalog: &'a RegionCatalog, params: &RemapParams) -> Self {
        let build = || CatalogCursor::new(catalog, *params.min_depth(), *params.tolerance());
        Self { reads: build(), mates: build(), alternates: build() }
    }

    fn fallbacks(&self) -> u64 {
        self.reads.fallbacks() + self.mates.fallbacks() + self.alternates.fallbacks()
    }
}

/// Mapped mate lying outside of the catalog. Its partner was unmapped, so it needs the mate-side rewrite.
struct OutsideMate {
    name: Vec<u8>,
    placement: Placement,
    // Segment bits of the partner
    segment: u16,
}

impl OutsideMate {
    const SEGMENT: u16 = flags::FIRST_IN_TEMPLATE | flags::LAST_IN_TEMPLATE;

    fn new(partner: &AlignedRecord, placement: Placement) -> Self {
        Self { name: partner.name.clone(), placement, segment: partner.flags & Self::SEGMENT }
    }

    fn matches(&self, record: &AlignedRecord) -> bool {
        record.name == self.name
            && record.role() == RecordRole::Primary
            && !record.has(flags::UNMAPPED)
            && record.flags & Self::SEGMENT != self.segment
            && record.placement.as_ref() == Some(&self.placement)
    }
}

struct Decider<'a, 'b> {
    decision: UnmapDecision,
    ctx: &'b TaskContext<'a>,
}

impl<'a, 'b> Decider<'a, 'b> {
    fn process(
        &self,
        mut record: AlignedRecord,
        matched: RegionMatchType,
        cursors: &mut Cursors,
    ) -> Result<Option<OutsideMate>> {
        let stats = self.ctx.stats;
        if record.malformed {
            stats.add_anomalies(1);
        }

        let mate_match = self.mate_match(&record, &mut cursors.mates);
        let alternate = record.alternates.iter().any(|alt| {
            let matched = cursors.alternates.overlap(&alt.placement.contig, alt.span());
            self.decision.decide_for_alternate(alt, matched)
        });

        match record.role() {
            RecordRole::Secondary => {
                stats.secondary.add(self.decision.decide_for_read(&record, matched));
                Ok(None)
            }
            RecordRole::Supplementary => {
                let reason = self.decision.decide_for_read(&record, matched);
                stats.supplementary.add(reason);
                if reason.is_none() && alternate {
                    stats.add_supplementary_by_alternate(1);
                }
                if !reason.is_none() || alternate {
                    RecordMutator::drop_supplementary(&mut record);
                }
                Ok(None)
            }
            RecordRole::Primary => self.primary(record, matched, mate_match, alternate),
        }
    }

    fn mate_match(&self, record: &AlignedRecord, cursor: &mut CatalogCursor) -> RegionMatchType {
        if !record.is_paired() || record.has(flags::MATE_UNMAPPED) {
            return RegionMatchType::None;
        }
        match (&record.mate.placement, record.mate_span()) {
            (Some(placement), Some(span)) => cursor.overlap(&placement.contig, span),
            _ => {
                debug!("Paired read {} has no mate placement", String::from_utf8_lossy(&record.name));
                self.ctx.stats.add_anomalies(1);
                RegionMatchType::None
            }
        }
    }

    fn primary(
        &self,
        mut record: AlignedRecord,
        matched: RegionMatchType,
        mate_match: RegionMatchType,
        alternate: bool,
    ) -> Result<Option<OutsideMate>> {
        let stats = self.ctx.stats;
        let already_unmapped = record.has(flags::UNMAPPED);
        let mate_mapped = record.is_paired() && !record.is_mate_unmapped();

        let mut reason =
            if already_unmapped { UnmapReason::None } else { self.decision.decide_for_read(&record, matched) };
        let mut mate = mate_mapped && self.decision.decide_for_mate(&record, mate_match);

        // Both ends of a pair must reach the same verdict from either side
        if reason.is_none() && mate && matched != RegionMatchType::None && !already_unmapped {
            reason = UnmapReason::Chimeric;
        }
        if !reason.is_none() && !mate && mate_mapped && mate_match != RegionMatchType::None {
            mate = true;
        }

        let clear_alternates = reason.is_none() && alternate && !already_unmapped;
        if reason.is_none() && !mate && !clear_alternates {
            return Ok(None);
        }

        // A mapped mate that is kept here overlaps no interval, the second pass rewrites it
        let outside = match &record.mate.placement {
            Some(placement) if !reason.is_none() && !mate && mate_mapped => {
                Some(OutsideMate::new(&record, placement.clone()))
            }
            _ => None,
        };

        stats.reads.add(reason);
        match (reason.is_none(), mate) {
            (false, true) => {
                RecordMutator::unmap_mate(&mut record, false, true);
                RecordMutator::unmap_read(&mut record, true, false);
            }
            (false, false) => {
                let mate_unmapped = record.is_mate_unmapped();
                RecordMutator::unmap_read(&mut record, mate_unmapped, false);
            }
            (true, true) => {
                RecordMutator::unmap_mate(&mut record, already_unmapped, false);
                if already_unmapped {
                    RecordMutator::unmap_read(&mut record, true, false);
                }
            }
            (true, false) => {}
        }
        if mate {
            stats.add_mates(1);
        }
        if clear_alternates && !record.alternates.is_empty() {
            RecordMutator::clear_alternate_alignments(&mut record);
            stats.add_alternates_cleared(1);
        }

        let route = self.ctx.router.route(record)?;
        trace!("Routed to {:?}, reason {:?}", route, reason);
        Ok(outside)
    }

    /// Second pass over the mates of unmapped reads. Nobody else fetches them: they overlap no interval.
    fn outside_mates(
        &self,
        mut mates: Vec<OutsideMate>,
        source: &mut impl RecordSource,
        cursors: &mut Cursors,
    ) -> Result<()> {
        mates.sort_by(|a, b| (&a.placement.contig, a.placement.pos).cmp(&(&b.placement.contig, b.placement.pos)));
        for mate in mates {
            let (contig, pos) = (mate.placement.contig.clone(), mate.placement.pos);
            let mut found = None;
            for record in source.fetch(&Interval::new(contig, pos..pos + 1))? {
                let record = record?;
                if mate.matches(&record) {
                    found = Some(record);
                    break;
                }
            }
            match found {
                Some(record) => self.outside_mate(record, cursors)?,
                None => {
                    debug!("Mate of {} is missing at {}", String::from_utf8_lossy(&mate.name), mate.placement);
                    self.ctx.stats.add_anomalies(1);
                }
            }
        }
        Ok(())
    }

    fn outside_mate(&self, mut record: AlignedRecord, cursors: &mut Cursors) -> Result<()> {
        let matched = match (&record.placement, record.span()) {
            (Some(placement), Some(span)) => cursors.alternates.overlap(&placement.contig, span),
            _ => RegionMatchType::None,
        };
        // Overlapping records are handled by the task owning them
        if matched != RegionMatchType::None {
            return Ok(());
        }

        let mate_match = self.mate_match(&record, &mut cursors.mates);
        if !self.decision.decide_for_mate(&record, mate_match) {
            return Ok(());
        }
        RecordMutator::unmap_mate(&mut record, false, false);
        self.ctx.stats.add_mates(1);
        let route = self.ctx.router.route(record)?;
        trace!("Outside mate routed to {:?}", route);
        Ok(())
    }
}
