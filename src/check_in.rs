//! Check-ins: cron and heartbeat events, and the scheduler that delivers them.

pub mod digest;
pub mod event;
pub mod pending;
pub mod scheduler;

pub use digest::{Digest, Occurrence};
pub use event::{CheckInEvent, CheckInKind, CheckInType};
pub use scheduler::Scheduler;

use std::sync::Arc;

/// Handle for reporting check-ins through a shared scheduler
#[derive(Clone)]
pub struct CheckIns {
    scheduler: Arc<Scheduler>,
}

impl CheckIns {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler }
    }

    /// Report that the cron job `identifier` finished.
    ///
    /// Each call is a separate occurrence and is never coalesced with another.
    pub fn cron(&self, identifier: impl Into<String>) {
        Cron::new(identifier).finish(self);
    }

    /// Report the start of cron job `identifier`, run `job`, and report its
    /// finish if `job` succeeded. A failed job only leaves the start event.
    pub fn cron_with<T, E>(
        &self,
        identifier: impl Into<String>,
        job: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let cron = Cron::new(identifier);
        cron.start(self);
        let output = job()?;
        cron.finish(self);
        Ok(output)
    }

    /// Report a heartbeat for `identifier`.
    pub fn heartbeat(&self, identifier: impl Into<String>) {
        self.scheduler.schedule(CheckInEvent::heartbeat(identifier));
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }
}

/// One occurrence of a cron job
///
/// The start and finish events of a `Cron` share its occurrence token, so
/// reporting the same event twice before it is transmitted only sends the
/// latest one.
#[derive(Debug, Clone)]
pub struct Cron {
    identifier: String,
    occurrence: Occurrence,
}

impl Cron {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            occurrence: Occurrence::next(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn start_event(&self) -> CheckInEvent {
        CheckInEvent::cron(self.identifier.clone(), CheckInKind::Start, self.occurrence)
    }

    pub fn finish_event(&self) -> CheckInEvent {
        CheckInEvent::cron(self.identifier.clone(), CheckInKind::Finish, self.occurrence)
    }

    pub fn start(&self, check_ins: &CheckIns) {
        check_ins.scheduler.schedule(self.start_event());
    }

    pub fn finish(&self, check_ins: &CheckIns) {
        check_ins.scheduler.schedule(self.finish_event());
    }
}
