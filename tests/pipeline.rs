use std::collections::HashMap;
use std::io::Write;

use rust_htslib::bam::record::CigarString;
use tempfile::NamedTempFile;

use depthguard::core::audit::ConsistencyAuditor;
use depthguard::core::io::bed;
use depthguard::core::io::memory::{InMemorySource, MemorySink};
use depthguard::core::params::RemapParams;
use depthguard::core::read::{flags, AlignedRecord, Placement};
use depthguard::core::regions::{Flagged, RegionCatalog};
use depthguard::core::run::{OutputRouter, RegionTask, TaskContext, TaskScheduler};
use depthguard::core::stats::UnmapStats;

const PAIR: u16 = flags::PAIRED | flags::PROPER_PAIR;

fn cigar(text: &str) -> CigarString {
    CigarString::try_from(text).unwrap()
}

/// Forward/reverse pair on chr1, both ends carrying the MC tag.
fn pair(name: &str, (pos1, cigar1): (u64, &str), (pos2, cigar2): (u64, &str)) -> [AlignedRecord; 2] {
    let insert = (pos2 + 100) as i64 - pos1 as i64;
    let mut first = AlignedRecord::new(name.as_bytes(), PAIR | flags::FIRST_IN_TEMPLATE | flags::MATE_REVERSE);
    first.placement = Some(Placement::new("chr1", pos1));
    first.cigar = cigar(cigar1);
    first.mapq = 60;
    first.mate.placement = Some(Placement::new("chr1", pos2));
    first.mate.cigar = Some(cigar(cigar2));
    first.insert_size = insert;

    let mut second = AlignedRecord::new(name.as_bytes(), PAIR | flags::LAST_IN_TEMPLATE | flags::REVERSE);
    second.placement = Some(Placement::new("chr1", pos2));
    second.cigar = cigar(cigar2);
    second.mapq = 60;
    second.mate.placement = Some(Placement::new("chr1", pos1));
    second.mate.cigar = Some(cigar(cigar1));
    second.insert_size = -insert;
    [first, second]
}

struct Outcome {
    stats: UnmapStats,
    relocated: Vec<AlignedRecord>,
    unmapped: Vec<AlignedRecord>,
}

fn remap(catalog: &RegionCatalog, params: &RemapParams, records: Vec<AlignedRecord>) -> Outcome {
    let stats = UnmapStats::default();
    let (relocated, unmapped) = (MemorySink::new(), MemorySink::new());
    let auditor = ConsistencyAuditor::new();
    {
        let router = OutputRouter::new(&relocated, &unmapped, &stats).with_auditor(&auditor);
        let ctx = TaskContext { catalog, params, router: &router, stats: &stats };
        let source = InMemorySource::new(records);
        TaskScheduler::new(RegionTask::from_catalog(catalog), *params.workers())
            .run(|| Ok(source.clone()), ctx, |_| {})
            .unwrap();
    }
    let (relocated, unmapped) = (relocated.into_inner(), unmapped.into_inner());

    let report = auditor.verify(relocated.clone(), unmapped.clone(), &stats);
    assert!(report.is_consistent(), "{:?}", report);
    Outcome { stats, relocated, unmapped }
}

fn names(records: &[AlignedRecord]) -> Vec<String> {
    let mut names: Vec<String> = records
        .iter()
        .map(|x| {
            let segment = if x.has(flags::LAST_IN_TEMPLATE) { 2 } else { 1 };
            format!("{}/{}", String::from_utf8_lossy(&x.name), segment)
        })
        .collect();
    names.sort();
    names
}

fn reconciliation() -> (RegionCatalog, Vec<AlignedRecord>) {
    let catalog = RegionCatalog::new([
        ("chr1".to_string(), Flagged::new(1000..1200, 500)),
        ("chr1".to_string(), Flagged::new(1300..1350, 50)),
    ])
    .unwrap();

    let mut records = vec![];
    records.extend(pair("both_high", (1010, "100M"), (1090, "100M")));
    records.extend(pair("one_high", (1050, "100M"), (20000, "100M")));
    records.extend(pair("clipped", (1310, "30S20M"), (30000, "50M")));
    records.extend(pair("clean", (1305, "20M"), (1325, "20M")));

    let mut far = AlignedRecord::new(b"far", 0);
    far.placement = Some(Placement::new("chr1", 5000));
    far.cigar = cigar("100M");
    records.push(far);

    records.push(AlignedRecord::new(b"lost", flags::UNMAPPED));
    (catalog, records)
}

#[test]
fn reconcile() {
    let (catalog, records) = reconciliation();
    for workers in [1, 4] {
        let params = RemapParams::new(20, 200, 1000, 10, 500, workers).unwrap();
        let outcome = remap(&catalog, &params, records.clone());

        assert_eq!(outcome.stats.high_depth_count(), 3);
        assert_eq!(outcome.stats.long_soft_clip_count(), 1);
        assert_eq!(outcome.stats.chimeric_count(), 0);
        assert_eq!(outcome.stats.tasks(), 3);

        assert_eq!(names(&outcome.relocated), ["clipped/1", "clipped/2", "one_high/1", "one_high/2"]);
        assert_eq!(names(&outcome.unmapped), ["both_high/1", "both_high/2", "lost/1"]);
        assert_eq!(outcome.stats.mates(), 2);

        // Unmapped reads sit on their mapped mates, and the mates point back at them
        for record in &outcome.relocated {
            let mate = record.mate.placement.clone().unwrap();
            assert_eq!(record.placement, Some(mate));
            assert!(record.has(flags::UNMAPPED) != record.has(flags::MATE_UNMAPPED));
            assert!(!record.has(flags::PROPER_PAIR));
            if record.has(flags::UNMAPPED) {
                assert!(record.original.is_some());
            } else {
                assert!(record.original_mate.is_some());
            }
        }
        for record in outcome.unmapped.iter().filter(|x| x.name == b"both_high") {
            assert!(record.has(flags::UNMAPPED) && record.has(flags::MATE_UNMAPPED));
            assert!(record.placement.is_none() && record.mate.placement.is_none());
        }
    }
}

struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

#[test]
fn pair_consistency() {
    // Alternating high-depth and low-depth intervals every kilobase
    let catalog = RegionCatalog::new(
        (0..40u64).map(|x| ("chr1".to_string(), Flagged::new(x * 1000..x * 1000 + 300, if x % 2 == 0 { 500 } else { 40 }))),
    )
    .unwrap();

    let mut rng = Lcg(42);
    let mut records = vec![];
    for id in 0..2000 {
        let pos1 = rng.next(40_000);
        let pos2 = if rng.next(8) == 0 { pos1 + 5000 } else { pos1 + rng.next(400) };
        let cigar1 = if rng.next(4) == 0 { "25S75M" } else { "100M" };
        let cigar2 = if rng.next(4) == 0 { "80M20H" } else { "100M" };
        records.extend(pair(&format!("p{}", id), (pos1, cigar1), (pos2, cigar2)));
    }

    for workers in [1, 3] {
        let params = RemapParams::new(20, 200, 1000, 10, 500, workers).unwrap();
        let outcome = remap(&catalog, &params, records.clone());

        let mut emitted: HashMap<(Vec<u8>, bool), AlignedRecord> = HashMap::new();
        for record in outcome.relocated.into_iter().chain(outcome.unmapped) {
            let key = (record.name.clone(), record.has(flags::LAST_IN_TEMPLATE));
            assert!(emitted.insert(key, record).is_none(), "record emitted twice");
        }
        assert!(!emitted.is_empty());

        let mut rewritten = 0;
        for id in 0..2000 {
            let name = format!("p{}", id).into_bytes();
            match (emitted.get(&(name.clone(), false)), emitted.get(&(name, true))) {
                (Some(first), Some(second)) => {
                    rewritten += 1;
                    assert_eq!(first.has(flags::UNMAPPED), second.has(flags::MATE_UNMAPPED), "pair p{}", id);
                    assert_eq!(second.has(flags::UNMAPPED), first.has(flags::MATE_UNMAPPED), "pair p{}", id);
                    assert_eq!(first.mate.placement, second.placement, "pair p{}", id);
                    assert_eq!(second.mate.placement, first.placement, "pair p{}", id);
                }
                (None, None) => {}
                (Some(_), None) | (None, Some(_)) => panic!("pair p{} is rewritten on one end only", id),
            }
        }
        assert!(rewritten > 0);
        assert_eq!(outcome.stats.anomalies(), 0);
    }
}

#[test]
fn catalog_from_bed() {
    let mut bed = NamedTempFile::new().unwrap();
    writeln!(bed, "# flagged intervals").unwrap();
    writeln!(bed, "chr1\t1000\t1200\t500").unwrap();
    writeln!(bed, "chr1\t1300\t1350\t50\textra").unwrap();
    bed.flush().unwrap();

    let catalog = bed::load(bed.path()).unwrap();
    assert_eq!(catalog.len(), 2);

    let (expected, records) = reconciliation();
    assert_eq!(catalog.get("chr1"), expected.get("chr1"));

    let params = RemapParams::default();
    let outcome = remap(&catalog, &params, records);
    assert_eq!(outcome.relocated.len() + outcome.unmapped.len(), 7);
}
