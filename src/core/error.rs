use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RemapError>;

#[derive(Error, Debug)]
pub enum RemapError {
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("Failed to parse {}, line {line}: {reason}", .path.display())]
    RegionsFormat { path: PathBuf, line: usize, reason: String },

    #[error("Flagged intervals {contig}:{first} and {contig}:{second} overlap")]
    OverlappingIntervals { contig: String, first: String, second: String },

    #[error("Chromosome '{0}' is missing from the BAM header")]
    UnknownContig(String),

    #[error("HTS I/O failed: {0}")]
    Hts(#[from] rust_htslib::errors::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Output sink '{0}' was closed before all records were written")]
    SinkClosed(&'static str),

    #[error("Worker thread panicked: {0}")]
    WorkerPanic(String),

    #[error("Failed to start the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
