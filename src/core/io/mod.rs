use bio_types::genome::Interval;
#[cfg(test)]
use mockall::automock;

use super::error::Result;
use super::read::AlignedRecord;

pub mod bed;
pub mod hts;
pub mod memory;

pub type Records<'a> = Box<dyn Iterator<Item = Result<AlignedRecord>> + 'a>;

/// Position sliceable collection of aligned records.
pub trait RecordSource {
    /// Records overlapping the interval, in coordinate order.
    fn fetch(&mut self, interval: &Interval) -> Result<Records<'_>>;
    /// Records without any placement on the reference.
    fn unplaced(&mut self) -> Result<Records<'_>>;
}

/// Append-only output shared between workers.
#[cfg_attr(test, automock)]
pub trait RecordSink {
    fn write(&self, record: AlignedRecord) -> Result<()>;
}
