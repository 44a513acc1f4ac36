//! Integration tests for the check-in scheduler's debounce, batching and
//! shutdown behavior.

use crate::integration::test_utils::{
    check_in_config, scheduler, take_at_most, wait_for, with_captured_logs, RecordingTransmitter,
    Response,
};
use appsignal_check_in::check_in::{CheckInEvent, CheckInKind, Cron, Occurrence, Scheduler};
use appsignal_check_in::error::TransmitError;
use appsignal_check_in::transmitter::Transmitter;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn finish(identifier: &str) -> CheckInEvent {
    CheckInEvent::cron(identifier, CheckInKind::Finish, Occurrence::next())
}

#[test]
fn test_no_worker_or_timer_without_events() {
    let transmitter = RecordingTransmitter::new();
    let scheduler = scheduler(check_in_config(100, 10_000), &transmitter);

    assert!(!scheduler.has_worker());
    assert!(!scheduler.has_armed_timer());

    take_at_most(Duration::from_millis(100), || scheduler.stop());

    assert!(!scheduler.has_worker());
    assert!(!scheduler.has_armed_timer());
    assert_eq!(transmitter.batch_count(), 0);
}

#[test]
fn test_stop_twice_is_a_no_op() {
    let transmitter = RecordingTransmitter::new();
    let scheduler = scheduler(check_in_config(10_000, 10_000), &transmitter);

    scheduler.schedule(finish("test"));
    scheduler.stop();
    assert_eq!(scheduler.transmitted(), 1);

    take_at_most(Duration::from_millis(100), || scheduler.stop());
    assert_eq!(scheduler.transmitted(), 1);
    assert_eq!(transmitter.batch_count(), 1);
}

#[test]
fn test_scheduling_logs_and_transmits_after_debounce() {
    with_captured_logs(|logs| {
        let transmitter = RecordingTransmitter::new();
        let scheduler = scheduler(check_in_config(200, 10_000), &transmitter);

        let event = finish("test");
        let description = event.describe();
        scheduler.schedule(event);

        assert!(logs.contains(&format!("Scheduling {} to be transmitted", description)));
        assert!(scheduler.has_worker());
        assert!(scheduler.has_armed_timer());

        assert!(wait_for(WAIT, || scheduler.transmitted() == 1));
        assert!(wait_for(WAIT, || logs
            .contains(&format!("Transmitted {}", description))));
        assert!(description.starts_with("cron check-in `test` finish event (digest "));
        assert_eq!(transmitter.identifiers(), vec![vec!["test".to_string()]]);

        scheduler.stop();
    });
}

#[test]
fn test_stop_flushes_pending_events_immediately() {
    let transmitter = RecordingTransmitter::new();
    let scheduler = scheduler(check_in_config(10_000, 10_000), &transmitter);

    scheduler.schedule(finish("test"));
    assert_eq!(transmitter.batch_count(), 0);

    take_at_most(Duration::from_secs(1), || scheduler.stop());

    assert_eq!(scheduler.transmitted(), 1);
    assert_eq!(transmitter.identifiers(), vec![vec!["test".to_string()]]);
    assert!(scheduler.pending_events().is_empty());
    assert!(!scheduler.has_worker());
    assert!(!scheduler.has_armed_timer());
}

#[test]
fn test_burst_is_transmitted_as_one_batch() {
    with_captured_logs(|logs| {
        let transmitter = RecordingTransmitter::new();
        let scheduler = scheduler(check_in_config(100, 10_000), &transmitter);

        scheduler.schedule(finish("first"));
        scheduler.schedule(finish("second"));
        scheduler.schedule(finish("third"));

        assert!(wait_for(WAIT, || scheduler.transmitted() == 1));
        assert_eq!(
            transmitter.identifiers(),
            vec![vec![
                "first".to_string(),
                "second".to_string(),
                "third".to_string()
            ]]
        );
        assert!(wait_for(WAIT, || logs.contains("Transmitted 3 check-in events")));

        scheduler.stop();
        assert_eq!(transmitter.batch_count(), 1);
    });
}

#[test]
fn test_events_after_first_transmission_wait_for_next_window() {
    with_captured_logs(|logs| {
        let transmitter = RecordingTransmitter::new();
        let scheduler = scheduler(check_in_config(50, 300), &transmitter);

        scheduler.schedule(finish("first"));
        assert!(wait_for(WAIT, || scheduler.transmitted() == 1));

        scheduler.schedule(finish("second"));
        scheduler.schedule(finish("third"));
        assert!(scheduler.has_armed_timer());
        assert_eq!(transmitter.batch_count(), 1);

        assert!(wait_for(WAIT, || scheduler.transmitted() == 2));
        assert_eq!(
            transmitter.identifiers(),
            vec![
                vec!["first".to_string()],
                vec!["second".to_string(), "third".to_string()],
            ]
        );
        assert!(wait_for(WAIT, || logs.contains("Transmitted 2 check-in events")));

        scheduler.stop();
    });
}

#[test]
fn test_events_during_first_transmission_wait_for_next_window() {
    let transmitter =
        RecordingTransmitter::scripted(vec![Response::Slow(Duration::from_millis(300))]);
    let scheduler = scheduler(check_in_config(20, 5_000), &transmitter);

    scheduler.schedule(finish("first"));
    // The batch is recorded when the attempt starts, before the slow response
    assert!(wait_for(WAIT, || transmitter.batch_count() == 1));
    assert_eq!(scheduler.transmitted(), 0);

    scheduler.schedule(finish("second"));
    thread::sleep(Duration::from_millis(700));
    assert_eq!(transmitter.batch_count(), 1);
    assert_eq!(scheduler.transmitted(), 1);
    assert!(scheduler.has_armed_timer());

    scheduler.stop();
    assert_eq!(
        transmitter.identifiers(),
        vec![vec!["first".to_string()], vec!["second".to_string()]]
    );
}

#[test]
fn test_failed_attempts_are_counted() {
    let transmitter = RecordingTransmitter::scripted(vec![
        Response::Status(404),
        Response::Error(TransmitError::Timeout("deadline elapsed".to_string())),
    ]);
    let scheduler = scheduler(check_in_config(10, 10), &transmitter);

    scheduler.schedule(finish("first"));
    assert!(wait_for(WAIT, || scheduler.transmitted() == 1));
    scheduler.schedule(finish("second"));
    assert!(wait_for(WAIT, || scheduler.transmitted() == 2));
    scheduler.schedule(finish("third"));
    assert!(wait_for(WAIT, || scheduler.transmitted() == 3));

    assert_eq!(scheduler.failed(), 2);
    scheduler.stop();
}

#[test]
fn test_same_digest_is_replaced_before_transmission() {
    with_captured_logs(|logs| {
        let transmitter = RecordingTransmitter::new();
        let scheduler = scheduler(check_in_config(10_000, 10_000), &transmitter);

        let cron = Cron::new("test");
        let first = cron.finish_event();
        let second = cron.finish_event();
        assert_eq!(first.digest, second.digest);

        scheduler.schedule(first);
        scheduler.schedule(second);
        assert_eq!(scheduler.pending_events().len(), 1);

        scheduler.stop();

        assert_eq!(transmitter.identifiers(), vec![vec!["test".to_string()]]);
        assert_eq!(logs.count("Scheduling cron check-in `test` finish event"), 1);
        assert_eq!(logs.count("Replacing previously scheduled cron check-in `test`"), 1);
        let scheduling = logs.line_of("Scheduling cron check-in `test`");
        let replacing = logs.line_of("Replacing previously scheduled");
        assert!(scheduling < replacing);
    });
}

#[test]
fn test_start_and_finish_of_one_occurrence_are_both_sent() {
    let transmitter = RecordingTransmitter::new();
    let scheduler = scheduler(check_in_config(10_000, 10_000), &transmitter);

    let cron = Cron::new("backup");
    scheduler.schedule(cron.start_event());
    scheduler.schedule(cron.finish_event());
    scheduler.stop();

    let batches = transmitter.batches();
    assert_eq!(batches.len(), 1);
    let kinds: Vec<_> = batches[0].iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![Some(CheckInKind::Start), Some(CheckInKind::Finish)]
    );
}

#[test]
fn test_events_after_stop_are_dropped() {
    with_captured_logs(|logs| {
        let transmitter = RecordingTransmitter::new();
        let scheduler = scheduler(check_in_config(10, 10), &transmitter);

        scheduler.stop();
        assert!(scheduler.is_queue_closed());

        let event = finish("late");
        let description = event.describe();
        scheduler.schedule(event);

        assert!(logs.contains(&format!(
            "Cannot transmit {}: AppSignal is stopped",
            description
        )));
        assert!(!logs.contains("Scheduling"));
        assert!(scheduler.pending_events().is_empty());
        assert!(!scheduler.has_worker());
        assert_eq!(transmitter.batch_count(), 0);
    });
}

#[test]
fn test_queue_closes_after_stop_with_running_worker() {
    let transmitter = RecordingTransmitter::new();
    let scheduler = scheduler(check_in_config(10_000, 10_000), &transmitter);

    scheduler.schedule(finish("test"));
    assert!(!scheduler.is_queue_closed());

    scheduler.stop();
    assert!(scheduler.is_queue_closed());

    scheduler.schedule(finish("late"));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(transmitter.identifiers(), vec![vec!["test".to_string()]]);
}

#[test]
fn test_inactive_scheduler_drops_events() {
    with_captured_logs(|logs| {
        let transmitter = RecordingTransmitter::new();
        let dyn_transmitter: Arc<dyn Transmitter> = transmitter.clone();
        let scheduler = Scheduler::new(check_in_config(10, 10), dyn_transmitter, || false);

        let event = CheckInEvent::heartbeat("worker");
        let description = event.describe();
        scheduler.schedule(event);

        assert!(logs.contains(&format!(
            "Cannot transmit {}: AppSignal is not active",
            description
        )));
        assert!(description.starts_with("heartbeat check-in `worker` event (digest "));
        assert!(!scheduler.has_worker());
        assert!(!scheduler.has_armed_timer());

        scheduler.stop();
        assert_eq!(transmitter.batch_count(), 0);
    });
}

#[test]
fn test_bad_status_does_not_block_later_events() {
    with_captured_logs(|logs| {
        let transmitter = RecordingTransmitter::scripted(vec![Response::Status(404)]);
        let scheduler = scheduler(check_in_config(10, 10), &transmitter);

        let failing = finish("first");
        let failing_description = failing.describe();
        scheduler.schedule(failing);
        assert!(wait_for(WAIT, || scheduler.transmitted() == 1));
        assert!(wait_for(WAIT, || logs.contains(&format!(
            "Failed to transmit {}: 404 status code",
            failing_description
        ))));

        let next = finish("second");
        let next_description = next.describe();
        scheduler.schedule(next);
        assert!(wait_for(WAIT, || scheduler.transmitted() == 2));
        assert!(wait_for(WAIT, || logs
            .contains(&format!("Transmitted {}", next_description))));

        // The failed batch is not retried
        assert_eq!(
            transmitter.identifiers(),
            vec![vec!["first".to_string()], vec!["second".to_string()]]
        );
        scheduler.stop();
    });
}

#[test]
fn test_transport_error_does_not_block_later_events() {
    with_captured_logs(|logs| {
        let transmitter = RecordingTransmitter::scripted(vec![Response::Error(
            TransmitError::Connection("connection refused".to_string()),
        )]);
        let scheduler = scheduler(check_in_config(10, 10), &transmitter);

        let failing = finish("first");
        let failing_description = failing.describe();
        scheduler.schedule(failing);
        assert!(wait_for(WAIT, || scheduler.transmitted() == 1));
        assert!(wait_for(WAIT, || logs.contains(&format!(
            "Failed to transmit {}: Connection error: connection refused",
            failing_description
        ))));

        scheduler.schedule(finish("second"));
        assert!(wait_for(WAIT, || scheduler.transmitted() == 2));
        assert_eq!(transmitter.batch_count(), 2);
        scheduler.stop();
    });
}

#[test]
fn test_panicking_transmitter_does_not_kill_worker() {
    with_captured_logs(|logs| {
        let transmitter = RecordingTransmitter::scripted(vec![Response::Panic]);
        let scheduler = scheduler(check_in_config(10, 10), &transmitter);

        scheduler.schedule(finish("first"));
        assert!(wait_for(WAIT, || scheduler.transmitted() == 1));
        assert!(wait_for(WAIT, || logs.contains("Failed to transmit cron check-in `first`")));

        scheduler.schedule(finish("second"));
        assert!(wait_for(WAIT, || scheduler.transmitted() == 2));
        assert!(wait_for(WAIT, || logs.contains("Transmitted cron check-in `second`")));
        scheduler.stop();
    });
}

#[test]
fn test_failed_batch_names_first_event_and_count() {
    with_captured_logs(|logs| {
        let transmitter = RecordingTransmitter::scripted(vec![Response::Status(500)]);
        let scheduler = scheduler(check_in_config(10_000, 10_000), &transmitter);

        let first = finish("first");
        let first_description = first.describe();
        scheduler.schedule(first);
        scheduler.schedule(finish("second"));
        scheduler.schedule(finish("third"));
        scheduler.stop();

        assert!(logs.contains(&format!(
            "Failed to transmit {} and 2 other check-in events: 500 status code",
            first_description
        )));
        assert_eq!(scheduler.transmitted(), 1);
    });
}

#[test]
fn test_concurrent_scheduling_from_many_threads() {
    let transmitter = RecordingTransmitter::new();
    let scheduler = Arc::new(scheduler(check_in_config(10_000, 10_000), &transmitter));

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let scheduler = Arc::clone(&scheduler);
            thread::spawn(move || {
                for i in 0..10 {
                    scheduler.schedule(finish(&format!("job-{}-{}", n, i)));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(scheduler.pending_events().len(), 80);
    scheduler.stop();

    let batches = transmitter.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 80);
    assert_eq!(scheduler.transmitted(), 1);
}

#[test]
fn test_dropping_scheduler_flushes() {
    let transmitter = RecordingTransmitter::new();
    {
        let scheduler = scheduler(check_in_config(10_000, 10_000), &transmitter);
        scheduler.schedule(CheckInEvent::heartbeat("worker"));
    }
    assert_eq!(transmitter.identifiers(), vec![vec!["worker".to_string()]]);
}
