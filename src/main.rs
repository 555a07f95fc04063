//! `tacopt` command line entry point.

use std::error::Error as _;
use std::process;

use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::{fmt, EnvFilter};

use tacopt::cli::Cli;
use tacopt::error::Error;

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter =
        EnvFilter::from_default_env().add_directive(format!("tacopt={log_level}").parse().unwrap());
    fmt().with_env_filter(env_filter).with_target(false).init();

    if let Err(err) = cli.run() {
        error!("{err}");
        let mut cause = err.source();
        while let Some(source) = cause {
            error!("  caused by: {source}");
            cause = source.source();
        }
        process::exit(exit_code(&err));
    }
}

/// Exit status per §7: malformed IR is a distinct failure class from
/// ordinary I/O or configuration trouble, so scripts can tell them apart.
fn exit_code(err: &Error) -> i32 {
    match err {
        Error::Malformed(_) | Error::Json(_) => 2,
        Error::Io(_) | Error::Config(_) => 1,
        _ => 1,
    }
}
