use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use indicatif::ProgressBar;
use log::{info, warn};

use crate::core::audit::ConsistencyAuditor;
use crate::core::error::RemapError;
use crate::core::io::hts::{self, HtsSink, HtsSource};
use crate::core::run::{OutputRouter, RegionTask, TaskContext, TaskScheduler};
use crate::core::stats::{UnmapStats, UnmapSummary};

use super::{args, parse, style};

fn save_stats(path: &Path, summary: &UnmapSummary) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
    writer.serialize(summary)?;
    writer.flush()?;
    Ok(())
}

pub fn run(matches: &ArgMatches, factory: impl Fn() -> ProgressBar) -> Result<()> {
    let params = parse::params(factory(), matches)?;
    let catalog = parse::catalog(factory(), matches)?;
    let (input, header) = parse::input(factory(), matches)?;
    let outputs = parse::outputs(matches)?;
    let verify = matches.is_present(args::runtime::VERIFY);

    let stats = UnmapStats::default();
    let auditor = ConsistencyAuditor::new();
    let relocated = HtsSink::create(&outputs.relocated, &header, "relocated")
        .with_context(|| format!("Failed to create {}", outputs.relocated.display()))?;
    let unmapped = HtsSink::create(&outputs.unmapped, &header, "unmapped")
        .with_context(|| format!("Failed to create {}", outputs.unmapped.display()))?;

    let mut router = OutputRouter::new(&relocated, &unmapped, &stats);
    if verify {
        router = router.with_auditor(&auditor);
    }
    let ctx = TaskContext { catalog: &catalog, params: &params, router: &router, stats: &stats };

    let tasks = RegionTask::from_catalog(&catalog);
    let pbar = factory();
    pbar.set_style(style::tasks::running());
    pbar.set_length(tasks.len() as u64);
    pbar.set_draw_delta((*params.workers() * 10) as u64);

    let result = TaskScheduler::new(tasks, *params.workers()).run(|| HtsSource::open(&input), ctx, |_| pbar.inc(1));

    let (written, unplaced) = (relocated.finish(), unmapped.finish());
    if let Err(err) = result {
        // A writer that failed closes its queue, report the writer error instead
        if matches!(err, RemapError::SinkClosed(_)) {
            written?;
            unplaced?;
        }
        return Err(err.into());
    }
    let (written, unplaced) = (written?, unplaced?);

    let summary = stats.summary();
    pbar.set_style(style::tasks::finished());
    pbar.finish_with_message(format!(
        "Finished {} tasks: {} relocated and {} fully unmapped records",
        summary.tasks, written, unplaced
    ));
    info!(
        "Unmapped reads: {} high depth, {} clipped, {} chimeric; mates unmapped: {}; dropped secondary/supplementary: {}/{}",
        summary.high_depth,
        summary.soft_clip,
        summary.chimeric,
        summary.mates,
        summary.secondary_dropped,
        summary.supplementary_dropped
    );
    if summary.anomalies > 0 {
        warn!("{} input anomalies (missing mate data, malformed SA/MC tags, unsorted records)", summary.anomalies);
    }

    if let Some(path) = &outputs.stats {
        save_stats(path, &summary).with_context(|| format!("Failed to save statistics to {}", path.display()))?;
    }

    if verify {
        let pbar = factory();
        pbar.set_message("Verifying outputs...");
        let report = auditor.verify(hts::read_all(&outputs.relocated)?, hts::read_all(&outputs.unmapped)?, &stats);
        if report.is_consistent() {
            pbar.finish_with_message("Verification passed");
        } else {
            pbar.finish_with_message(format!(
                "Verification found {} missing, {} unexpected records and {} count mismatches",
                report.missing.len(),
                report.unexpected.len(),
                report.count_mismatches.len()
            ));
        }
    }

    let routed = summary.relocated + summary.fully_unmapped;
    if written + unplaced != routed {
        bail!("Writers lost records: {} routed, {} written", routed, written + unplaced);
    }
    Ok(())
}
