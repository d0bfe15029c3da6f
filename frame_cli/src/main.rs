//! storyframe CLI entry point.

use std::{process, str::FromStr};

use clap::Parser;
use log::{debug, error, info, LevelFilter};

use frame_cli::Args;

fn main() {
    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", args.log_level);
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting storyframe");
    debug!(args:?; "Parsed arguments");

    match frame_cli::run(&args) {
        Ok(status) => {
            info!(status:?; "Finished");
            process::exit(status.exit_code());
        }
        Err(err) => {
            error!(code = err.error_code(); "{err}");
            if let Ok(json) = serde_json::to_string_pretty(&err) {
                eprintln!("{json}");
            }
            process::exit(1);
        }
    }
}
