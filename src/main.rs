//! `aide-scan` binary entry point — parses CLI arguments and dispatches
//! into [`aide_scan_engine::cli`].

use std::process::ExitCode;

use aide_scan_engine::cli::Cli;
use clap::Parser;

fn main() -> ExitCode {
    let args = Cli::parse();
    aide_scan_engine::cli::run(&args)
}
