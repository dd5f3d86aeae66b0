use indicatif::{ProgressFinish, ProgressStyle};

/// Spinners for the short setup steps (parsing, loading intervals, opening BAM files).
pub fn step() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("[{elapsed_precise}] {spinner} {msg}")
        .tick_strings(&["▹▹▹▹▹", "▸▹▹▹▹", "▹▸▹▹▹", "▹▹▸▹▹", "▹▹▹▸▹", "▹▹▹▹▸", "▪▪▪▪▪"])
        .on_finish(ProgressFinish::AndLeave)
}

pub mod tasks {
    use super::*;

    pub fn running() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:60.cyan/blue} {pos:>7}/{len:7} intervals {msg}")
            .progress_chars("##-")
    }

    pub fn finished() -> ProgressStyle {
        ProgressStyle::default_bar().template("[{elapsed_precise}] {msg}").on_finish(ProgressFinish::AndLeave)
    }
}
