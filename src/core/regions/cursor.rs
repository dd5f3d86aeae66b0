use std::ops::Range;

use bio_types::genome::Position;
use log::debug;

use super::{Flagged, MaxDepth, RegionCatalog, RegionMatchType};

// Forward steps tried before the cursor gives up and binary searches
const MAX_STEPS: usize = 16;

#[derive(Debug, PartialEq, Eq)]
pub struct Hit<'a, T> {
    pub index: usize,
    pub interval: &'a Flagged<T>,
    pub covered: u64,
}

/// Resumable search over sorted, disjoint intervals of a single chromosome.
///
/// Queries are expected to arrive in non-decreasing start order. Anything else is still answered
/// correctly, but through a binary search instead of the incremental walk.
pub struct IntervalCursor<'a, T> {
    intervals: &'a [Flagged<T>],
    tolerance: u64,
    last: Option<usize>,
    fallbacks: u64,
}

impl<'a, T> IntervalCursor<'a, T> {
    pub fn new(intervals: &'a [Flagged<T>], tolerance: u64) -> Self {
        Self { intervals, tolerance, last: None, fallbacks: 0 }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Number of times the cached state was discarded in favour of a binary search.
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks
    }

    /// Best overlapping interval for the query, if it passes the tolerance rule.
    pub fn overlap(&mut self, query: Range<Position>) -> Option<Hit<'a, T>> {
        if self.intervals.is_empty() || query.is_empty() {
            return None;
        }

        let intervals = self.intervals;
        let first = self.seek(query.start).unwrap_or(0);
        intervals[first..]
            .iter()
            .enumerate()
            .take_while(|(_, x)| x.range.start < query.end)
            .filter_map(|(offset, x)| {
                let covered = covered(&x.range, &query);
                if self.accepts(covered, &query) {
                    Some(Hit { index: first + offset, interval: x, covered })
                } else {
                    None
                }
            })
            .max_by_key(|x| x.covered)
    }

    fn accepts(&self, covered: u64, query: &Range<Position>) -> bool {
        let len = query.end - query.start;
        covered > 0 && (covered == len || len - covered < self.tolerance)
    }

    // Index of the last interval starting at or before the position
    fn seek(&mut self, pos: Position) -> Option<usize> {
        let found = match self.last {
            Some(last) if last < self.intervals.len() && self.intervals[last].range.start <= pos => {
                self.walk(last, pos).or_else(|| {
                    debug!("Cursor walked more than {} intervals ahead, falling back to a binary search", MAX_STEPS);
                    self.fallbacks += 1;
                    self.search(pos)
                })
            }
            Some(last) => {
                debug!("Cursor at interval {} can't bracket position {}, falling back to a binary search", last, pos);
                self.fallbacks += 1;
                self.search(pos)
            }
            None => self.search(pos),
        };
        self.last = found;
        found
    }

    fn walk(&self, mut ind: usize, pos: Position) -> Option<usize> {
        for _ in 0..MAX_STEPS {
            match self.intervals.get(ind + 1) {
                Some(next) if next.range.start <= pos => ind += 1,
                _ => return Some(ind),
            }
        }
        None
    }

    fn search(&self, pos: Position) -> Option<usize> {
        self.intervals.partition_point(|x| x.range.start <= pos).checked_sub(1)
    }
}

fn covered(interval: &Range<Position>, query: &Range<Position>) -> u64 {
    let (start, end) = (interval.start.max(query.start), interval.end.min(query.end));
    end.saturating_sub(start)
}

/// Depth-aware lookup over the whole catalog, reseeding the cursor when the chromosome changes.
pub struct CatalogCursor<'a> {
    catalog: &'a RegionCatalog,
    min_depth: MaxDepth,
    tolerance: u64,
    contig: Option<String>,
    cursor: IntervalCursor<'a, MaxDepth>,
    fallbacks: u64,
}

impl<'a> CatalogCursor<'a> {
    pub fn new(catalog: &'a RegionCatalog, min_depth: MaxDepth, tolerance: u64) -> Self {
        Self {
            catalog,
            min_depth,
            tolerance,
            contig: None,
            cursor: IntervalCursor::new(&[], tolerance),
            fallbacks: 0,
        }
    }

    pub fn reset(&mut self) {
        self.cursor.reset();
    }

    pub fn fallbacks(&self) -> u64 {
        self.fallbacks + self.cursor.fallbacks()
    }

    /// Best hit as (interval index inside the contig, classification).
    pub fn hit(&mut self, contig: &str, query: Range<Position>) -> Option<(usize, RegionMatchType)> {
        if self.contig.as_deref() != Some(contig) {
            self.fallbacks += self.cursor.fallbacks();
            self.cursor = IntervalCursor::new(self.catalog.get(contig), self.tolerance);
            self.contig = Some(contig.to_owned());
        }
        let min_depth = self.min_depth;
        self.cursor.overlap(query).map(|hit| {
            let matched = if hit.interval.payload >= min_depth { RegionMatchType::HighDepth } else { RegionMatchType::Other };
            (hit.index, matched)
        })
    }

    pub fn overlap(&mut self, contig: &str, query: Range<Position>) -> RegionMatchType {
        self.hit(contig, query).map(|(_, matched)| matched).unwrap_or(RegionMatchType::None)
    }
}
