use std::collections::HashMap;
use std::ops::Range;

use bio_types::genome::{AbstractInterval, Interval, Position};
use itertools::Itertools;

pub use cursor::{CatalogCursor, Hit, IntervalCursor};

use super::error::{RemapError, Result};

mod cursor;

pub type MaxDepth = u32;

/// Classification of the best overlap between a read span and the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionMatchType {
    None,
    HighDepth,
    Other,
}

/// Half-open, 0-based interval with an attached payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flagged<T> {
    pub range: Range<Position>,
    pub payload: T,
}

impl<T> Flagged<T> {
    pub fn new(range: Range<Position>, payload: T) -> Self {
        Self { range, payload }
    }

    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

pub type FlaggedInterval = Flagged<MaxDepth>;

/// High-depth intervals grouped by chromosome, sorted and disjoint.
#[derive(Clone, Debug, Default)]
pub struct RegionCatalog {
    contigs: HashMap<String, Vec<FlaggedInterval>>,
}

impl RegionCatalog {
    pub fn new(records: impl IntoIterator<Item = (String, FlaggedInterval)>) -> Result<Self> {
        let mut contigs: HashMap<String, Vec<FlaggedInterval>> = HashMap::new();
        for (contig, interval) in records {
            if interval.is_empty() {
                continue;
            }
            contigs.entry(contig).or_default().push(interval);
        }

        for (contig, intervals) in contigs.iter_mut() {
            intervals.sort_by_key(|x| (x.range.start, x.range.end));
            if let Some((first, second)) = intervals.iter().tuple_windows().find(|(a, b)| a.range.end > b.range.start)
            {
                return Err(RemapError::OverlappingIntervals {
                    contig: contig.clone(),
                    first: format!("{}-{}", first.range.start, first.range.end),
                    second: format!("{}-{}", second.range.start, second.range.end),
                });
            }
        }
        Ok(Self { contigs })
    }

    pub fn get(&self, contig: &str) -> &[FlaggedInterval] {
        self.contigs.get(contig).map(|x| x.as_slice()).unwrap_or(&[])
    }

    pub fn contigs(&self) -> impl Iterator<Item = &str> {
        self.contigs.keys().map(|x| x.as_str()).sorted()
    }

    pub fn len(&self) -> usize {
        self.contigs.values().map(|x| x.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Intervals in a stable (contig, start) order together with their index inside the contig.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, &FlaggedInterval)> {
        self.contigs().flat_map(move |contig| self.get(contig).iter().enumerate().map(move |(ind, x)| (contig, ind, x)))
    }

    pub fn interval(&self, contig: &str, ind: usize) -> Option<Interval> {
        self.get(contig).get(ind).map(|x| Interval::new(contig.to_owned(), x.range.clone()))
    }
}

/// Interval padded on both sides, clamped at the chromosome start.
pub fn padded(interval: &Interval, padding: u64) -> Interval {
    let range = interval.range();
    let (start, end) = (range.start.saturating_sub(padding), range.end.saturating_add(padding));
    Interval::new(interval.contig().to_owned(), start..end)
}
