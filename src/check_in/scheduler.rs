//! Check-in Scheduler
//!
//! Accepts check-in events from any thread and delivers them to the collector
//! in debounced batches. Events are coalesced by digest while they wait. A
//! single worker thread performs every transmission; callers only ever take
//! the state lock for a few instructions.
//!
//! Each debounce cycle moves through `Idle -> Armed -> Flushing -> Idle`:
//! scheduling an event arms a timer if none is armed, the timer's expiry posts
//! a `Flush` signal, and the worker takes the whole pending set when it
//! handles that signal. `stop()` disarms the timer, flushes whatever is
//! pending, and waits for the worker to finish.

use crate::check_in::event::{describe_batch, CheckInEvent};
use crate::check_in::pending::{Insertion, PendingSet};
use crate::config::CheckInConfig;
use crate::error::AgentError;
use crate::transmitter::{is_success, Format, Transmitter};
use parking_lot::Mutex;
use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use tokio::runtime::{Builder, Handle};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Name of the background thread that transmits check-ins
pub const WORKER_THREAD_NAME: &str = "appsignal-check-in";

type ActiveCheck = dyn Fn() -> bool + Send + Sync;

/// Signals consumed by the worker, in posting order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Flush,
    Stop,
}

enum Debounce {
    Idle,
    Armed {
        generation: u64,
        timer: JoinHandle<()>,
    },
    /// A flush signal is posted and the worker has not taken the batch yet
    Flushing,
}

impl Debounce {
    fn is_armed(&self) -> bool {
        matches!(self, Debounce::Armed { .. })
    }

    fn is_armed_with(&self, expected: u64) -> bool {
        matches!(self, Debounce::Armed { generation, .. } if *generation == expected)
    }
}

struct Worker {
    thread: thread::JoinHandle<()>,
    /// Disconnected (or receives) once the worker thread has fully wound down
    done: std_mpsc::Receiver<()>,
    runtime: Handle,
}

struct State {
    stopped: bool,
    /// Set as soon as the first batch is handed to the transmitter
    ever_transmitted: bool,
    transmitted: u64,
    failed: u64,
    pending: PendingSet,
    debounce: Debounce,
    next_generation: u64,
    /// Dropped by `stop()`; the only sender, so dropping it closes the queue
    signals: Option<UnboundedSender<Signal>>,
    /// Held until the worker starts and takes it
    receiver: Option<UnboundedReceiver<Signal>>,
    worker: Option<Worker>,
}

impl State {
    fn post(&self, signal: Signal) {
        if let Some(signals) = &self.signals {
            if signals.send(signal).is_err() {
                debug!(?signal, "Check-in scheduler worker already exited");
            }
        }
    }
}

/// Debounced, batching check-in scheduler
pub struct Scheduler {
    state: Arc<Mutex<State>>,
    transmitter: Arc<dyn Transmitter>,
    config: CheckInConfig,
    is_active: Arc<ActiveCheck>,
}

enum Outcome {
    Stopped,
    Added(Insertion),
}

impl Scheduler {
    /// Create a scheduler. Nothing is spawned until the first event is scheduled.
    ///
    /// `is_active` is consulted on every `schedule` call; events scheduled while
    /// it returns `false` are dropped.
    pub fn new<F>(config: CheckInConfig, transmitter: Arc<dyn Transmitter>, is_active: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        let (signals, receiver) = unbounded_channel();
        Self {
            state: Arc::new(Mutex::new(State {
                stopped: false,
                ever_transmitted: false,
                transmitted: 0,
                failed: 0,
                pending: PendingSet::new(),
                debounce: Debounce::Idle,
                next_generation: 0,
                signals: Some(signals),
                receiver: Some(receiver),
                worker: None,
            })),
            transmitter,
            config,
            is_active: Arc::new(is_active),
        }
    }

    /// Schedule an event for transmission. Never blocks beyond the state lock.
    pub fn schedule(&self, event: CheckInEvent) {
        let description = event.describe();

        if !(self.is_active)() {
            debug!("Cannot transmit {}: AppSignal is not active", description);
            return;
        }

        let outcome = {
            let mut state = self.state.lock();
            if state.stopped {
                Outcome::Stopped
            } else {
                let insertion = state.pending.insert(event);
                match self.ensure_worker(&mut state) {
                    Ok(()) => self.arm_debounce(&mut state),
                    Err(e) => error!(error = %e, "Failed to start check-in scheduler"),
                }
                Outcome::Added(insertion)
            }
        };

        match outcome {
            Outcome::Stopped => {
                debug!("Cannot transmit {}: AppSignal is stopped", description);
            }
            Outcome::Added(Insertion::Scheduled) => {
                debug!("Scheduling {} to be transmitted", description);
            }
            Outcome::Added(Insertion::Replaced) => {
                debug!("Replacing previously scheduled {}", description);
            }
        }
    }

    /// Stop the scheduler, transmitting anything still pending.
    ///
    /// Idempotent. Blocks until the worker has finished its final flush, for at
    /// most the configured shutdown timeout.
    pub fn stop(&self) {
        let worker = {
            let mut state = self.state.lock();
            state.stopped = true;
            if let Debounce::Armed { timer, .. } =
                std::mem::replace(&mut state.debounce, Debounce::Idle)
            {
                timer.abort();
            }
            if state.worker.is_some() {
                state.post(Signal::Flush);
                state.post(Signal::Stop);
            }
            state.signals = None;
            state.receiver = None;
            state.worker.take()
        };

        let Some(worker) = worker else {
            return;
        };

        if worker.thread.thread().id() == thread::current().id() {
            // Called from a transmitter on the worker itself; the loop exits
            // on the posted stop signal.
            return;
        }

        let timeout = self.config.shutdown_timeout();
        match worker.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.thread.join().is_err() {
                    error!("Check-in scheduler worker panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    timeout_ms = timeout.as_millis(),
                    "Timed out waiting for check-in scheduler to transmit pending events"
                );
            }
        }
    }

    /// Number of transmission attempts made, successful or not
    pub fn transmitted(&self) -> u64 {
        self.state.lock().transmitted
    }

    /// Number of transmission attempts that were rejected or errored
    pub fn failed(&self) -> u64 {
        self.state.lock().failed
    }

    /// Events waiting for the next flush, in first-seen order
    pub fn pending_events(&self) -> Vec<CheckInEvent> {
        self.state.lock().pending.events().cloned().collect()
    }

    pub fn has_worker(&self) -> bool {
        self.state.lock().worker.is_some()
    }

    pub fn has_armed_timer(&self) -> bool {
        self.state.lock().debounce.is_armed()
    }

    pub fn is_queue_closed(&self) -> bool {
        self.state.lock().signals.is_none()
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    fn ensure_worker(&self, state: &mut State) -> Result<(), AgentError> {
        if state.worker.is_some() {
            return Ok(());
        }
        let Some(receiver) = state.receiver.take() else {
            return Err(AgentError::Worker("signal queue is closed".to_string()));
        };

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AgentError::Worker(format!("Failed to build runtime: {}", e)))?;
        let handle = runtime.handle().clone();
        let (done_tx, done) = std_mpsc::channel();
        let shared = Arc::clone(&self.state);
        let transmitter = Arc::clone(&self.transmitter);
        // Carry the caller's subscriber over so worker messages reach the same sink
        let dispatch = tracing::dispatcher::get_default(|current| current.clone());

        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                tracing::dispatcher::with_default(&dispatch, || {
                    runtime.block_on(worker_loop(shared, transmitter, receiver));
                    drop(runtime);
                });
                let _ = done_tx.send(());
            })
            .map_err(|e| AgentError::Worker(format!("Failed to spawn worker thread: {}", e)))?;

        state.worker = Some(Worker {
            thread,
            done,
            runtime: handle,
        });
        Ok(())
    }

    fn arm_debounce(&self, state: &mut State) {
        if state.debounce.is_armed() {
            return;
        }
        let Some(runtime) = state.worker.as_ref().map(|worker| worker.runtime.clone()) else {
            return;
        };

        let interval = if !state.ever_transmitted {
            self.config.initial_debounce()
        } else {
            self.config.between_transmissions_debounce()
        };
        let generation = state.next_generation;
        state.next_generation += 1;

        let shared = Arc::clone(&self.state);
        let timer = runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            let mut state = shared.lock();
            // A disarmed or superseded timer must not flush
            if state.debounce.is_armed_with(generation) {
                state.debounce = Debounce::Flushing;
                state.post(Signal::Flush);
            }
        });

        state.debounce = Debounce::Armed { generation, timer };
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn worker_loop(
    state: Arc<Mutex<State>>,
    transmitter: Arc<dyn Transmitter>,
    mut signals: UnboundedReceiver<Signal>,
) {
    debug!("Check-in scheduler worker started");

    while let Some(signal) = signals.recv().await {
        match signal {
            Signal::Flush => flush(&state, &transmitter).await,
            Signal::Stop => break,
        }
    }

    debug!("Check-in scheduler worker stopped");
}

async fn flush(state: &Mutex<State>, transmitter: &Arc<dyn Transmitter>) {
    let batch = {
        let mut state = state.lock();
        if matches!(state.debounce, Debounce::Flushing) {
            state.debounce = Debounce::Idle;
        }
        let batch = state.pending.take();
        if !batch.is_empty() {
            state.ever_transmitted = true;
        }
        batch
    };

    if batch.is_empty() {
        return;
    }

    let description = describe_batch(&batch);
    let failure_description = describe_failure(&batch);
    let size = batch.len();

    // Run the attempt as its own task so a panicking transmitter cannot take
    // the worker down with it
    let transmitter = Arc::clone(transmitter);
    let attempt = tokio::spawn(async move {
        transmitter.transmit(&batch, Format::Ndjson).await
    });

    let succeeded = match attempt.await {
        Ok(Ok(status)) if is_success(status) => {
            debug!(status, "Transmitted {}", description);
            true
        }
        Ok(Ok(status)) => {
            error!(
                batch_size = size,
                "Failed to transmit {}: {} status code", failure_description, status
            );
            false
        }
        Ok(Err(e)) => {
            error!(batch_size = size, "Failed to transmit {}: {}", failure_description, e);
            false
        }
        Err(e) => {
            error!(batch_size = size, "Failed to transmit {}: {}", failure_description, e);
            false
        }
    };

    let mut state = state.lock();
    state.transmitted += 1;
    if !succeeded {
        state.failed += 1;
    }
}

/// Failures name the first event of the batch; the rest are not reported individually.
fn describe_failure(batch: &[CheckInEvent]) -> String {
    match batch {
        [] => "0 check-in events".to_string(),
        [event] => event.describe(),
        [first, rest @ ..] => format!(
            "{} and {} other check-in events",
            first.describe(),
            rest.len()
        ),
    }
}
