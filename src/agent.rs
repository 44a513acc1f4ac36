//! Check-in Agent
//!
//! Owns the configuration, the active flag and the check-in scheduler for one
//! host application. There is no process-wide instance: the host creates an
//! `Agent`, starts it, hands out `CheckIns` handles and stops it on shutdown.

use crate::check_in::{CheckIns, Scheduler};
use crate::config::AppsignalConfig;
use crate::error::AgentError;
use crate::transmitter::{HttpTransmitter, Transmitter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub struct Agent {
    config: AppsignalConfig,
    active: Arc<AtomicBool>,
    scheduler: Arc<Scheduler>,
}

impl Agent {
    /// Create an agent delivering through the given transmitter.
    ///
    /// The agent starts inactive; check-ins are dropped until `start()`.
    pub fn new(config: AppsignalConfig, transmitter: Arc<dyn Transmitter>) -> Self {
        let active = Arc::new(AtomicBool::new(false));
        let probe = Arc::clone(&active);
        let scheduler = Arc::new(Scheduler::new(
            config.check_in.clone(),
            transmitter,
            move || probe.load(Ordering::Acquire),
        ));

        Self {
            config,
            active,
            scheduler,
        }
    }

    /// Create an agent delivering to the configured collector over HTTP.
    pub fn from_config(config: AppsignalConfig) -> Result<Self, AgentError> {
        Self::validate(&config)?;
        let transmitter = HttpTransmitter::new(&config)?;
        Ok(Self::new(config, Arc::new(transmitter)))
    }

    /// Activate the agent if its configuration asks for it.
    pub fn start(&self) -> Result<(), AgentError> {
        Self::validate(&self.config)?;

        if self.config.active {
            self.active.store(true, Ordering::Release);
            info!(
                name = %self.config.name,
                environment = %self.config.environment,
                "Started check-in agent"
            );
        } else {
            info!(
                environment = %self.config.environment,
                "Check-in agent not active for this environment"
            );
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop the agent, transmitting pending check-ins first.
    ///
    /// Later check-ins are dropped as stopped.
    pub fn stop(&self) {
        self.scheduler.stop();
        info!("Stopped check-in agent");
    }

    pub fn check_ins(&self) -> CheckIns {
        CheckIns::new(Arc::clone(&self.scheduler))
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn config(&self) -> &AppsignalConfig {
        &self.config
    }

    fn validate(config: &AppsignalConfig) -> Result<(), AgentError> {
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            AgentError::Config(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }
}
