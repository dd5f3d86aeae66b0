use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

use log::{info, warn};

use super::read::{flags, AlignedRecord, RecordRole};
use super::stats::{Route, UnmapStats};

/// Identity of an emitted record: (read name, template segment, role).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub name: Vec<u8>,
    pub segment: u16,
    pub role: RecordRole,
}

impl From<&AlignedRecord> for RecordKey {
    fn from(record: &AlignedRecord) -> Self {
        Self {
            name: record.name.clone(),
            segment: record.flags & (flags::FIRST_IN_TEMPLATE | flags::LAST_IN_TEMPLATE),
            role: record.role(),
        }
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let segment = match self.segment {
            flags::FIRST_IN_TEMPLATE => "/1",
            flags::LAST_IN_TEMPLATE => "/2",
            _ => "",
        };
        write!(f, "{}{} ({:?})", String::from_utf8_lossy(&self.name), segment, self.role)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discrepancy {
    pub route: Route,
    pub key: RecordKey,
    pub expected: u32,
    pub observed: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// Routed during the run but absent (or under-represented) in the output
    pub missing: Vec<Discrepancy>,
    /// Present in the output more often than routed, including records never routed at all
    pub unexpected: Vec<Discrepancy>,
    /// (route, counted by the stats, found in the output)
    pub count_mismatches: Vec<(Route, u64, u64)>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.count_mismatches.is_empty()
    }
}

/// Tallies every routed record and compares the tally with a second pass over the written output.
#[derive(Debug, Default)]
pub struct ConsistencyAuditor {
    routed: Mutex<HashMap<(Route, RecordKey), u32>>,
}

impl ConsistencyAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: &AlignedRecord, route: Route) {
        let mut routed = self.routed.lock().unwrap_or_else(|x| x.into_inner());
        *routed.entry((route, RecordKey::from(record))).or_default() += 1;
    }

    pub fn verify(
        self,
        relocated: impl IntoIterator<Item = AlignedRecord>,
        unmapped: impl IntoIterator<Item = AlignedRecord>,
        stats: &UnmapStats,
    ) -> AuditReport {
        let mut expected = self.routed.into_inner().unwrap_or_else(|x| x.into_inner());
        let mut report = AuditReport::default();

        for (route, records) in [
            (Route::Relocated, relocated.into_iter().collect::<Vec<_>>()),
            (Route::FullyUnmapped, unmapped.into_iter().collect()),
        ] {
            let written = records.len() as u64;
            if written != stats.written(route) {
                report.count_mismatches.push((route, stats.written(route), written));
            }

            let mut observed: HashMap<RecordKey, u32> = HashMap::new();
            for record in &records {
                *observed.entry(RecordKey::from(record)).or_default() += 1;
            }
            for (key, observed) in observed {
                let expected = expected.remove(&(route, key.clone())).unwrap_or(0);
                let discrepancy = Discrepancy { route, key, expected, observed };
                if observed > expected {
                    report.unexpected.push(discrepancy);
                } else if observed < expected {
                    report.missing.push(discrepancy);
                }
            }
        }
        // Routed but never written
        for ((route, key), expected) in expected {
            report.missing.push(Discrepancy { route, key, expected, observed: 0 });
        }

        Self::log(&report);
        report
    }

    fn log(report: &AuditReport) {
        if report.is_consistent() {
            info!("Audit passed: the output matches every routing decision");
            return;
        }
        for (route, counted, written) in &report.count_mismatches {
            warn!("Audit: {:?} stream has {} records, but {} were routed", route, written, counted);
        }
        for x in &report.missing {
            warn!("Audit: {} expected {} times in the {:?} stream, found {}", x.key, x.expected, x.route, x.observed);
        }
        for x in &report.unexpected {
            warn!("Audit: {} found {} times in the {:?} stream, expected {}", x.key, x.observed, x.route, x.expected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, flag: u16) -> AlignedRecord {
        AlignedRecord::new(name.as_bytes(), flag)
    }

    fn routed(auditor: &ConsistencyAuditor, stats: &UnmapStats, record: &AlignedRecord, route: Route) {
        auditor.record(record, route);
        stats.routed(route);
    }

    #[test]
    fn consistent() {
        let (auditor, stats) = (ConsistencyAuditor::new(), UnmapStats::default());
        let first = record("a", flags::PAIRED | flags::FIRST_IN_TEMPLATE);
        let second = record("a", flags::PAIRED | flags::LAST_IN_TEMPLATE);
        let single = record("b", flags::UNMAPPED);
        routed(&auditor, &stats, &first, Route::Relocated);
        routed(&auditor, &stats, &second, Route::FullyUnmapped);
        routed(&auditor, &stats, &single, Route::FullyUnmapped);

        let report = auditor.verify(vec![first], vec![single, second], &stats);
        assert!(report.is_consistent(), "{:?}", report);
    }

    #[test]
    fn discrepancies() {
        let (auditor, stats) = (ConsistencyAuditor::new(), UnmapStats::default());
        let first = record("a", flags::PAIRED | flags::FIRST_IN_TEMPLATE);
        let second = record("a", flags::PAIRED | flags::LAST_IN_TEMPLATE);
        routed(&auditor, &stats, &first, Route::Relocated);
        routed(&auditor, &stats, &second, Route::Relocated);

        // The second mate landed in the wrong stream, the first one was written twice
        let report = auditor.verify(vec![first.clone(), first], vec![second], &stats);
        assert!(!report.is_consistent());
        assert_eq!(report.count_mismatches, vec![(Route::FullyUnmapped, 0, 1)]);
        assert_eq!(report.unexpected.len(), 2);
        assert_eq!(report.missing.len(), 1);
        assert_eq!(report.missing[0].key.segment, flags::LAST_IN_TEMPLATE);
        assert_eq!(report.missing[0].route, Route::Relocated);
    }
}
