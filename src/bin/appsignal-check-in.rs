//! AppSignal check-in CLI
//!
//! Reports a single cron or heartbeat check-in and exits once it is transmitted.

use appsignal_check_in::cli::{self, Cli};
use appsignal_check_in::logging::init_logging;
use clap::Parser;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(Some(&cli.logging_config(&config))) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Check-in CLI starting");

    match cli::run(&cli, config) {
        Ok(()) => info!("Check-in reported"),
        Err(e) => {
            error!("Check-in failed: {:#}", e);
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}
