use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::thread;
use std::thread::JoinHandle;

use bio_types::genome::{AbstractInterval, Interval};
use crossbeam_channel::{bounded, Sender};
use log::{debug, info};
use rust_htslib::bam::record::{Aux, CigarString};
use rust_htslib::bam::{self, FetchDefinition, HeaderView, IndexedReader, Read, Record};

use crate::core::error::{RemapError, Result};
use crate::core::read::{AlignedRecord, AlternateAlignment, MateSummary, OriginalAlignment, OriginalMate, Placement};

use super::{RecordSink, RecordSource, Records};

const ALTERNATES_TAG: &[u8] = b"SA";
const MATE_CIGAR_TAG: &[u8] = b"MC";
const ORIGINAL_TAG: &[u8] = b"OA";
const ORIGINAL_MATE_TAG: &[u8] = b"OM";
const MANAGED_TAGS: [&[u8]; 4] = [ALTERNATES_TAG, MATE_CIGAR_TAG, ORIGINAL_TAG, ORIGINAL_MATE_TAG];

// Records buffered between the workers and the writer thread
const SINK_CAPACITY: usize = 4096;

/// Chromosome name -> BAM target id.
#[derive(Clone, Debug, Default)]
pub struct ContigIds(HashMap<String, i32>);

impl ContigIds {
    pub fn from_header(header: &HeaderView) -> Self {
        Self(
            (0..header.target_count())
                .map(|tid| (String::from_utf8_lossy(header.tid2name(tid)).to_string(), tid as i32))
                .collect(),
        )
    }

    fn tid(&self, placement: &Option<Placement>) -> Result<i32> {
        match placement {
            None => Ok(-1),
            Some(p) => self.0.get(&p.contig).copied().ok_or_else(|| RemapError::UnknownContig(p.contig.clone())),
        }
    }
}

fn placement(header: &HeaderView, tid: i32, pos: i64) -> Option<Placement> {
    if tid < 0 || pos < 0 || tid as u32 >= header.target_count() {
        return None;
    }
    Some(Placement::new(String::from_utf8_lossy(header.tid2name(tid as u32)), pos as u64))
}

fn string_aux<'a>(record: &'a Record, tag: &[u8]) -> std::result::Result<Option<&'a str>, ()> {
    match record.aux(tag) {
        Ok(Aux::String(text)) => Ok(Some(text)),
        Ok(_) => Err(()),
        Err(_) => Ok(None),
    }
}

/// Converts a BAM record into the engine's record model.
pub fn decode(record: Record, header: &HeaderView) -> AlignedRecord {
    let mut result = AlignedRecord::new(record.qname(), record.flags());
    result.placement = placement(header, record.tid(), record.pos());
    result.cigar = record.cigar().take();
    result.mapq = record.mapq();
    result.insert_size = record.insert_size();

    let mate_cigar = match string_aux(&record, MATE_CIGAR_TAG) {
        Ok(Some(text)) => CigarString::try_from(text).map_err(|_| ()).map(Some),
        Ok(None) => Ok(None),
        Err(()) => Err(()),
    };
    result.mate = MateSummary {
        placement: placement(header, record.mtid(), record.mpos()),
        cigar: mate_cigar.clone().unwrap_or(None),
    };

    let alternates = match string_aux(&record, ALTERNATES_TAG) {
        Ok(Some(text)) => AlternateAlignment::parse_list(text).ok_or(()),
        Ok(None) => Ok(vec![]),
        Err(()) => Err(()),
    };
    result.alternates = alternates.clone().unwrap_or_default();

    // Unparsable OA/OM tags stay on the template and are written back untouched
    if let Ok(Some(text)) = string_aux(&record, ORIGINAL_TAG) {
        result.original = OriginalAlignment::parse(text);
    }
    if let Ok(Some(text)) = string_aux(&record, ORIGINAL_MATE_TAG) {
        result.original_mate = OriginalMate::parse(text);
    }

    if mate_cigar.is_err() || alternates.is_err() {
        debug!("Malformed SA/MC tags for read {}", String::from_utf8_lossy(record.qname()));
        result.malformed = true;
    }
    result.template = Some(record);
    result
}

/// Builds a fresh BAM record: core fields from the model, sequence and unrelated tags from the template.
pub fn encode(record: &AlignedRecord, contigs: &ContigIds) -> Result<Record> {
    let mut result = Record::new();
    match &record.template {
        Some(template) => {
            let (seq, qual) = (template.seq().as_bytes(), template.qual().to_vec());
            result.set(&record.name, Some(&record.cigar), &seq, &qual);
            for aux in template.aux_iter() {
                let (tag, value) = aux?;
                if !MANAGED_TAGS.contains(&tag) {
                    result.push_aux(tag, value)?;
                }
            }
        }
        None => result.set(&record.name, Some(&record.cigar), &[], &[]),
    }

    result.set_tid(contigs.tid(&record.placement)?);
    result.set_pos(record.placement.as_ref().map(|x| x.pos as i64).unwrap_or(-1));
    result.set_mtid(contigs.tid(&record.mate.placement)?);
    result.set_mpos(record.mate.placement.as_ref().map(|x| x.pos as i64).unwrap_or(-1));
    result.set_insert_size(record.insert_size);
    result.set_mapq(record.mapq);
    result.set_flags(record.flags);

    if !record.alternates.is_empty() {
        let text: String = record.alternates.iter().map(|x| x.to_string()).collect();
        result.push_aux(ALTERNATES_TAG, Aux::String(&text))?;
    }
    if let Some(cigar) = &record.mate.cigar {
        result.push_aux(MATE_CIGAR_TAG, Aux::String(&cigar.to_string()))?;
    }
    let originals = [
        (ORIGINAL_TAG, record.original.as_ref().map(|x| x.to_string())),
        (ORIGINAL_MATE_TAG, record.original_mate.as_ref().map(|x| x.to_string())),
    ];
    for (tag, latest) in originals {
        if let Some(text) = history(record, tag, latest) {
            result.push_aux(tag, Aux::String(&text))?;
        }
    }
    Ok(result)
}

// OA/OM hold a list of previous placements, the latest one goes first
fn history(record: &AlignedRecord, tag: &[u8], latest: Option<String>) -> Option<String> {
    let previous = match record.template.as_ref().map(|x| x.aux(tag)) {
        Some(Ok(Aux::String(text))) => Some(text.to_owned()),
        _ => None,
    };
    match (latest, previous) {
        (Some(latest), Some(previous)) if previous.starts_with(&latest) => Some(previous),
        (Some(latest), Some(previous)) => Some(latest + &previous),
        (latest, previous) => latest.or(previous),
    }
}

/// Indexed BAM/CRAM reader. Every worker opens its own instance.
pub struct HtsSource {
    reader: IndexedReader,
    header: HeaderView,
}

impl HtsSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = IndexedReader::from_path(path.as_ref())?;
        let header = reader.header().clone();
        Ok(Self { reader, header })
    }

    pub fn header(&self) -> &HeaderView {
        &self.header
    }

    fn records(&mut self) -> Records<'_> {
        let (reader, header) = (&mut self.reader, &self.header);
        Box::new(std::iter::from_fn(move || {
            let mut record = Record::new();
            match reader.read(&mut record) {
                None => None,
                Some(Err(err)) => Some(Err(err.into())),
                Some(Ok(())) => Some(Ok(decode(record, header))),
            }
        }))
    }
}

impl RecordSource for HtsSource {
    fn fetch(&mut self, interval: &Interval) -> Result<Records<'_>> {
        if self.header.tid(interval.contig().as_bytes()).is_none() {
            debug!("Chromosome {} is absent in the BAM header, skipping", interval.contig());
            return Ok(Box::new(std::iter::empty()));
        }
        let range = interval.range();
        let (start, end) = (range.start.min(i64::MAX as u64) as i64, range.end.min(i64::MAX as u64) as i64);
        self.reader.fetch((interval.contig(), start, end))?;
        Ok(self.records())
    }

    fn unplaced(&mut self) -> Result<Records<'_>> {
        self.reader.fetch(FetchDefinition::Unmapped)?;
        Ok(self.records())
    }
}

/// BAM writer running in a dedicated thread. Workers only encode and enqueue records.
pub struct HtsSink {
    name: &'static str,
    contigs: ContigIds,
    sender: Option<Sender<Record>>,
    handle: Option<JoinHandle<Result<u64>>>,
}

impl HtsSink {
    pub fn create(path: impl AsRef<Path>, header: &HeaderView, name: &'static str) -> Result<Self> {
        let path: PathBuf = path.as_ref().to_owned();
        let template = bam::Header::from_template(header);
        // Fail early on unwritable paths
        bam::Writer::from_path(&path, &template, bam::Format::Bam)?;

        let (sender, receiver) = bounded::<Record>(SINK_CAPACITY);
        let handle = thread::Builder::new().name(format!("{}-writer", name)).spawn(move || -> Result<u64> {
            let mut writer = bam::Writer::from_path(&path, &template, bam::Format::Bam)?;
            let mut written = 0;
            for record in receiver {
                writer.write(&record)?;
                written += 1;
            }
            info!("{} records written to {}", written, path.display());
            Ok(written)
        })?;

        Ok(Self { name, contigs: ContigIds::from_header(header), sender: Some(sender), handle: Some(handle) })
    }

    /// Flushes the queue and waits for the writer thread.
    pub fn finish(mut self) -> Result<u64> {
        self.sender.take();
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| RemapError::WorkerPanic(format!("{} writer", self.name)))?,
            None => Ok(0),
        }
    }
}

impl RecordSink for HtsSink {
    fn write(&self, record: AlignedRecord) -> Result<()> {
        let encoded = encode(&record, &self.contigs)?;
        match &self.sender {
            Some(sender) => sender.send(encoded).map_err(|_| RemapError::SinkClosed(self.name)),
            None => Err(RemapError::SinkClosed(self.name)),
        }
    }
}

/// Sequentially reads a whole (possibly unsorted and unindexed) BAM file.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<AlignedRecord>> {
    let mut reader = bam::Reader::from_path(path.as_ref())?;
    let header = reader.header().clone();
    let mut result = Vec::new();
    let mut record = Record::new();
    while let Some(status) = reader.read(&mut record) {
        status?;
        result.push(decode(record.clone(), &header));
    }
    Ok(result)
}
