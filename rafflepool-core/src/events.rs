use crate::oracle::RequestId;
use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notifications emitted as the round progresses. Consumers subscribe via
/// `Raffle::subscribe`; the raffle itself never depends on a listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RaffleEvent {
    EntryAccepted {
        participant: Uuid,
        paid: Amount,
        total_entries: usize,
    },
    SettlementRequested {
        request_id: RequestId,
    },
    WinnerSelected {
        winner: Uuid,
        prize: Amount,
        request_id: RequestId,
    },
}
