use crate::core::audit::ConsistencyAuditor;
use crate::core::error::Result;
use crate::core::io::RecordSink;
use crate::core::read::AlignedRecord;
use crate::core::stats::{Route, UnmapStats};

/// Sends rewritten records to the "relocated" or the "fully-unmapped" stream.
pub struct OutputRouter<'a> {
    relocated: &'a (dyn RecordSink + Sync),
    unmapped: &'a (dyn RecordSink + Sync),
    stats: &'a UnmapStats,
    auditor: Option<&'a ConsistencyAuditor>,
}

impl<'a> OutputRouter<'a> {
    pub fn new(
        relocated: &'a (dyn RecordSink + Sync),
        unmapped: &'a (dyn RecordSink + Sync),
        stats: &'a UnmapStats,
    ) -> Self {
        Self { relocated, unmapped, stats, auditor: None }
    }

    pub fn with_auditor(mut self, auditor: &'a ConsistencyAuditor) -> Self {
        self.auditor = Some(auditor);
        self
    }

    /// Unmapped records without a mapped mate are fully unmapped, everything else is relocated.
    pub fn classify(record: &AlignedRecord) -> Route {
        if record.is_unmapped() && (!record.is_paired() || record.is_mate_unmapped()) {
            Route::FullyUnmapped
        } else {
            Route::Relocated
        }
    }

    pub fn route(&self, record: AlignedRecord) -> Result<Route> {
        let route = Self::classify(&record);
        self.send(record, route)?;
        Ok(route)
    }

    /// Records that had no placement upstream are forwarded as is.
    pub fn drain(&self, record: AlignedRecord) -> Result<()> {
        self.send(record, Route::FullyUnmapped)
    }

    fn send(&self, record: AlignedRecord, route: Route) -> Result<()> {
        if let Some(auditor) = self.auditor {
            auditor.record(&record, route);
        }
        match route {
            Route::Relocated => self.relocated.write(record)?,
            Route::FullyUnmapped => self.unmapped.write(record)?,
        }
        self.stats.routed(route);
        Ok(())
    }
}
