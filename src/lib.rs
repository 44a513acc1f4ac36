//! AppSignal Check-ins: debounced, batching delivery of cron and heartbeat check-ins
//!
//! Instrumented code reports check-ins from any thread without blocking; a
//! background scheduler coalesces them by digest, batches bursts, and
//! transmits each batch to the collector exactly once.

pub mod agent;
pub mod check_in;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod transmitter;
