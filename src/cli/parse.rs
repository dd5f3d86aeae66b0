use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use indicatif::ProgressBar;
use rust_htslib::bam::HeaderView;

use crate::core::io::bed;
use crate::core::io::hts::HtsSource;
use crate::core::params::RemapParams;
use crate::core::regions::RegionCatalog;

use super::args;

pub struct Outputs {
    pub relocated: PathBuf,
    pub unmapped: PathBuf,
    pub stats: Option<PathBuf>,
}

fn value<T>(matches: &ArgMatches, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = matches.value_of(name).ok_or_else(|| anyhow!("Missing value for --{}", name))?;
    raw.parse().map_err(|err| anyhow!("Invalid value '{}' for --{}: {}", raw, name, err))
}

pub fn params(pbar: ProgressBar, matches: &ArgMatches) -> Result<RemapParams> {
    pbar.set_message("Parsing thresholds...");
    let params = RemapParams::new(
        value(matches, args::thresholds::SOFT_CLIP)?,
        value(matches, args::thresholds::MIN_DEPTH)?,
        value(matches, args::thresholds::MAX_INSERT)?,
        value(matches, args::thresholds::TOLERANCE)?,
        value(matches, args::thresholds::PADDING)?,
        value(matches, args::runtime::THREADS)?,
    )?;
    pbar.finish_with_message(format!(
        "Thresholds: depth ≥ {}, clipped bases ≥ {}, |insert size| ≤ {}, tolerance {}bp, padding {}bp, {} thread(s)",
        params.min_depth(),
        params.soft_clip(),
        params.max_insert(),
        params.tolerance(),
        params.padding(),
        params.workers()
    ));
    Ok(params)
}

pub fn catalog(pbar: ProgressBar, matches: &ArgMatches) -> Result<RegionCatalog> {
    pbar.set_message("Loading flagged intervals...");
    let path: PathBuf = value(matches, args::io::REGIONS)?;
    let catalog = bed::load(&path).with_context(|| format!("Failed to load flagged intervals from {}", path.display()))?;
    pbar.finish_with_message(format!(
        "Flagged intervals: {} on {} chromosome(s)",
        catalog.len(),
        catalog.contigs().count()
    ));
    Ok(catalog)
}

/// Opens the input once to check the index and grab the header for the outputs.
pub fn input(pbar: ProgressBar, matches: &ArgMatches) -> Result<(PathBuf, HeaderView)> {
    pbar.set_message("Opening the input BAM...");
    let path: PathBuf = value(matches, args::io::INPUT)?;
    let source = HtsSource::open(&path).with_context(|| format!("Failed to open indexed BAM {}", path.display()))?;
    let header = source.header().clone();
    pbar.finish_with_message(format!("Input: {} ({} chromosomes)", path.display(), header.target_count()));
    Ok((path, header))
}

pub fn outputs(matches: &ArgMatches) -> Result<Outputs> {
    let outputs = Outputs {
        relocated: value(matches, args::io::RELOCATED)?,
        unmapped: value(matches, args::io::UNMAPPED)?,
        stats: matches.value_of(args::io::STATS).map(PathBuf::from),
    };
    if outputs.relocated == outputs.unmapped {
        return Err(anyhow!("--{} and --{} must be different files", args::io::RELOCATED, args::io::UNMAPPED));
    }
    Ok(outputs)
}
