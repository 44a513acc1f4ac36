//! Property-based tests for pending-set coalescing

use appsignal_check_in::check_in::pending::{Insertion, PendingSet};
use appsignal_check_in::check_in::{CheckInEvent, CheckInKind, Occurrence};
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    /// The pending set holds one event per digest, in first-seen order
    #[test]
    fn test_pending_set_coalesces_by_digest(occurrences in proptest::collection::vec(0u64..16, 0..64)) {
        let mut pending = PendingSet::new();
        let mut seen = Vec::new();

        for occurrence in &occurrences {
            let event = CheckInEvent::cron(
                "job",
                CheckInKind::Finish,
                Occurrence::from_u64(*occurrence),
            );
            let expected = if seen.contains(occurrence) {
                Insertion::Replaced
            } else {
                seen.push(*occurrence);
                Insertion::Scheduled
            };
            prop_assert_eq!(pending.insert(event), expected);
        }

        prop_assert_eq!(pending.len(), seen.len());

        let expected_order: Vec<_> = seen
            .iter()
            .map(|occurrence| {
                CheckInEvent::cron("job", CheckInKind::Finish, Occurrence::from_u64(*occurrence))
                    .digest
            })
            .collect();
        let batch = pending.take();
        let order: Vec<_> = batch.iter().map(|e| e.digest).collect();
        prop_assert_eq!(order, expected_order);

        let unique: HashSet<_> = batch.iter().map(|e| e.digest).collect();
        prop_assert_eq!(unique.len(), batch.len());
        prop_assert!(pending.is_empty());
    }
}
