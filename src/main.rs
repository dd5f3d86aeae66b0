use std::process::ExitCode;

use clap::{crate_authors, crate_description, crate_name, crate_version, Command};
use env_logger::Env;
use indicatif::ProgressBar;
use log::error;

use depthguard::cli;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let matches = Command::new(crate_name!())
        .author(crate_authors!("\n"))
        .version(crate_version!())
        .about(crate_description!())
        .max_term_width(120)
        .args(cli::args::all())
        .get_matches();

    let factory = || {
        let pbar = ProgressBar::new_spinner().with_style(cli::style::step());
        pbar.enable_steady_tick(100);
        pbar
    };

    match cli::run(&matches, factory) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}
