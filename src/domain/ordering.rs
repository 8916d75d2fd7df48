//! Stable event ordering for deterministic replay.

use crate::domain::LedgerEvent;

/// Total order over ledger events.
///
/// `(block_number, log_index)` ascending is the only legitimate basis for
/// causal decisions; wall-clock arrival order must never be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventOrderingKey {
    /// Block height (primary sort).
    pub block_number: u64,
    /// Position within the block (secondary sort).
    pub log_index: u64,
}

impl EventOrderingKey {
    pub fn new(block_number: u64, log_index: u64) -> Self {
        EventOrderingKey {
            block_number,
            log_index,
        }
    }

    /// Create an ordering key from a LedgerEvent.
    pub fn from_event(event: &LedgerEvent) -> Self {
        EventOrderingKey {
            block_number: event.block_number,
            log_index: event.log_index,
        }
    }

    /// Returns true if event_a should fold before event_b.
    pub fn should_come_before(event_a: &LedgerEvent, event_b: &LedgerEvent) -> bool {
        Self::from_event(event_a) < Self::from_event(event_b)
    }
}

/// Sort events into replay order.
pub fn sort_events_deterministic(events: &mut [LedgerEvent]) {
    events.sort_by_key(EventOrderingKey::from_event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, EventPayload, LoanId, TxHash};

    fn make_event(block_number: u64, log_index: u64) -> LedgerEvent {
        LedgerEvent::new(
            block_number,
            log_index,
            TxHash::new(format!("0x{:02x}{:02x}", block_number, log_index)),
            EventPayload::LoanNftTransferred {
                loan_id: LoanId::new(1),
                from: Address::new("0xaa"),
                to: Address::new("0xbb"),
            },
        )
    }

    #[test]
    fn test_ordering_by_block() {
        let a = make_event(100, 5);
        let b = make_event(200, 0);

        assert!(EventOrderingKey::should_come_before(&a, &b));
        assert!(!EventOrderingKey::should_come_before(&b, &a));
    }

    #[test]
    fn test_ordering_same_block_by_log_index() {
        let a = make_event(100, 1);
        let b = make_event(100, 2);

        assert!(EventOrderingKey::should_come_before(&a, &b));
        assert!(!EventOrderingKey::should_come_before(&b, &a));
    }

    #[test]
    fn test_sort_events_deterministic() {
        let mut events = vec![make_event(200, 1), make_event(100, 2), make_event(100, 1)];

        sort_events_deterministic(&mut events);

        assert_eq!(events[0].block_number, 100);
        assert_eq!(events[0].log_index, 1);
        assert_eq!(events[1].block_number, 100);
        assert_eq!(events[1].log_index, 2);
        assert_eq!(events[2].block_number, 200);
    }

    #[test]
    fn test_ordering_key_determinism() {
        let event = make_event(100, 3);
        let key1 = EventOrderingKey::from_event(&event);
        let key2 = EventOrderingKey::from_event(&event);
        assert_eq!(key1, key2);
    }
}
