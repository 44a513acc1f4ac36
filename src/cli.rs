//! Command-line reporting of check-ins, for cron jobs driven from shell scripts.

use crate::agent::Agent;
use crate::check_in::Cron;
use crate::config::{AppsignalConfig, ConfigLoader};
use crate::logging::LoggingConfig;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Report AppSignal check-ins
#[derive(Parser)]
#[command(name = "appsignal-check-in")]
#[command(about = "Report cron and heartbeat check-ins to AppSignal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root used to find config/appsignal.toml
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report a cron check-in
    Cron {
        /// Cron check-in identifier
        identifier: String,

        /// Report the start of the job instead of its finish
        #[arg(long, conflicts_with = "finish")]
        start: bool,

        /// Report the finish of the job (default)
        #[arg(long)]
        finish: bool,
    },
    /// Report a heartbeat check-in
    Heartbeat {
        /// Heartbeat check-in identifier
        identifier: String,
    },
}

impl Cli {
    /// Load configuration from `--config` or the project root.
    pub fn load_config(&self) -> anyhow::Result<AppsignalConfig> {
        match &self.config {
            Some(path) => ConfigLoader::load_from_file(path)
                .with_context(|| format!("Failed to load config file {}", path.display())),
            None => ConfigLoader::load(&self.root)
                .with_context(|| format!("Failed to load config from {}", self.root.display())),
        }
    }

    /// Apply `--verbose` and `--log-level` on top of the configured logging.
    pub fn logging_config(&self, config: &AppsignalConfig) -> LoggingConfig {
        let mut logging = config.logging.clone();
        if self.verbose {
            logging.level = "debug".to_string();
        }
        if let Some(level) = &self.log_level {
            logging.level = level.clone();
        }
        logging
    }
}

/// Report the requested check-in and wait for it to be transmitted.
pub fn run(cli: &Cli, config: AppsignalConfig) -> anyhow::Result<()> {
    if !config.active {
        bail!(
            "Check-ins are not active for environment '{}'; set `active = true` or APPSIGNAL_ACTIVE=true",
            config.environment
        );
    }

    let agent = Agent::from_config(config).context("Failed to create check-in agent")?;
    agent.start().context("Failed to start check-in agent")?;

    let check_ins = agent.check_ins();
    match &cli.command {
        Commands::Cron {
            identifier, start, ..
        } => {
            let cron = Cron::new(identifier.clone());
            if *start {
                cron.start(&check_ins);
            } else {
                cron.finish(&check_ins);
            }
        }
        Commands::Heartbeat { identifier } => check_ins.heartbeat(identifier.clone()),
    }

    // Stopping flushes immediately instead of waiting for the debounce
    agent.stop();

    let scheduler = agent.scheduler();
    if scheduler.transmitted() == 0 {
        bail!("Check-in was not transmitted");
    }
    if scheduler.failed() > 0 {
        bail!("Check-in was not accepted by the collector");
    }
    Ok(())
}
