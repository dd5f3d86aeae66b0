use std::sync::{Arc, Mutex};

use bio_types::genome::{AbstractInterval, Interval};

use crate::core::error::Result;
use crate::core::read::AlignedRecord;

use super::{RecordSink, RecordSource, Records};

/// Record source backed by a shared vector. Cloning is cheap, every worker gets its own handle.
#[derive(Clone, Default)]
pub struct InMemorySource {
    records: Arc<Vec<AlignedRecord>>,
}

impl InMemorySource {
    pub fn new(mut records: Vec<AlignedRecord>) -> Self {
        records.sort_by(|a, b| {
            let key = |x: &AlignedRecord| x.placement.as_ref().map(|p| (p.contig.clone(), p.pos));
            key(a).cmp(&key(b))
        });
        Self { records: Arc::new(records) }
    }
}

impl RecordSource for InMemorySource {
    fn fetch(&mut self, interval: &Interval) -> Result<Records<'_>> {
        let (contig, range) = (interval.contig().to_owned(), interval.range());
        let iter = self.records.iter().filter(move |x| {
            match (x.placement.as_ref(), x.span()) {
                (Some(placement), Some(span)) => {
                    placement.contig == contig && span.start < range.end && range.start < span.end
                }
                _ => false,
            }
        });
        Ok(Box::new(iter.cloned().map(Ok)))
    }

    fn unplaced(&mut self) -> Result<Records<'_>> {
        Ok(Box::new(self.records.iter().filter(|x| x.placement.is_none()).cloned().map(Ok)))
    }
}

/// Sink caching every written record, used by tests and by the verification pass.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<AlignedRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|x| x.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_inner(self) -> Vec<AlignedRecord> {
        self.records.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RecordSink for MemorySink {
    fn write(&self, record: AlignedRecord) -> Result<()> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use rust_htslib::bam::record::CigarString;

    use crate::core::read::Placement;

    use super::*;

    fn record(name: &str, placement: Option<(&str, u64)>) -> AlignedRecord {
        let mut record = AlignedRecord::new(name.as_bytes(), 0);
        record.placement = placement.map(|(contig, pos)| Placement::new(contig, pos));
        record.cigar = CigarString::try_from("10M").unwrap();
        record
    }

    fn names(records: Records) -> Vec<String> {
        records.map(|x| String::from_utf8(x.unwrap().name).unwrap()).collect_vec()
    }

    #[test]
    fn fetch() {
        let mut source = InMemorySource::new(vec![
            record("c", Some(("chr1", 200))),
            record("a", Some(("chr1", 5))),
            record("u", None),
            record("b", Some(("chr1", 95))),
            record("d", Some(("chr2", 100))),
        ]);

        assert_eq!(names(source.fetch(&Interval::new("chr1".into(), 0..100)).unwrap()), vec!["a", "b"]);
        assert_eq!(names(source.fetch(&Interval::new("chr1".into(), 100..200)).unwrap()), vec!["b"]);
        assert_eq!(names(source.fetch(&Interval::new("chr1".into(), 105..200)).unwrap()), Vec::<String>::new());
        assert_eq!(names(source.fetch(&Interval::new("chr2".into(), 105..106)).unwrap()), vec!["d"]);
        assert_eq!(names(source.unplaced().unwrap()), vec!["u"]);
    }

    #[test]
    fn sink() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());
        sink.write(record("a", None)).unwrap();
        sink.write(record("b", None)).unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.into_inner().len(), 2);
    }
}
