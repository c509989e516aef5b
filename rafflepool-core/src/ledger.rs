use crate::error::{RaffleError, Result};
use uuid::Uuid;

/// Ordered slot list for the current round. Insertion order is entry order;
/// a participant entering `k` times occupies `k` distinct slots.
#[derive(Debug, Default)]
pub struct EntryLedger {
    entries: Vec<Uuid>,
}

impl EntryLedger {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn append(&mut self, participant: Uuid) {
        self.entries.push(participant);
    }

    pub fn get(&self, index: usize) -> Result<Uuid> {
        self.entries
            .get(index)
            .copied()
            .ok_or(RaffleError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn slots(&self) -> &[Uuid] {
        &self.entries
    }

    /// Clears all slots. Invoked by the state machine as part of settlement
    /// completion, never directly by callers.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_insertion_order() {
        let mut ledger = EntryLedger::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        ledger.append(first);
        ledger.append(second);

        assert_eq!(ledger.count(), 2);
        assert_eq!(ledger.get(0).unwrap(), first);
        assert_eq!(ledger.get(1).unwrap(), second);
    }

    #[test]
    fn duplicate_participants_occupy_distinct_slots() {
        let mut ledger = EntryLedger::new();
        let participant = Uuid::new_v4();

        ledger.append(participant);
        ledger.append(participant);
        ledger.append(participant);

        assert_eq!(ledger.count(), 3);
        assert_eq!(ledger.get(2).unwrap(), participant);
    }

    #[test]
    fn get_out_of_range_reports_index_and_len() {
        let mut ledger = EntryLedger::new();
        ledger.append(Uuid::new_v4());

        match ledger.get(5) {
            Err(RaffleError::IndexOutOfRange { index, len }) => {
                assert_eq!(index, 5);
                assert_eq!(len, 1);
            }
            other => panic!("expected IndexOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn reset_clears_all_slots() {
        let mut ledger = EntryLedger::new();
        ledger.append(Uuid::new_v4());
        ledger.append(Uuid::new_v4());

        ledger.reset();

        assert!(ledger.is_empty());
        assert_eq!(ledger.count(), 0);
    }
}
