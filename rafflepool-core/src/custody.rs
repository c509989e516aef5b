use crate::error::{RaffleError, Result};
use async_trait::async_trait;
use bitcoin::Amount;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Outbound payment seam. Implementations move funds to a participant and
/// return a receipt; a rejected transfer must come back as an error, never
/// be swallowed.
#[async_trait]
pub trait PayoutSink: Send + Sync {
    async fn credit(&self, to: Uuid, amount: Amount) -> Result<String>;
}

/// Pooled balance for the current round. The only debit path is the single
/// transfer to the selected winner.
pub struct FundCustody {
    balance: Amount,
    sink: Arc<dyn PayoutSink>,
}

impl FundCustody {
    pub fn new(sink: Arc<dyn PayoutSink>) -> Self {
        Self {
            balance: Amount::ZERO,
            sink,
        }
    }

    pub fn deposit(&mut self, amount: Amount) {
        self.balance = self.balance + amount;
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Pays `amount` out to `to`. The pool is debited only after the sink
    /// accepts the transfer; a rejection leaves the balance untouched.
    pub async fn transfer(&mut self, to: Uuid, amount: Amount) -> Result<String> {
        if amount > self.balance {
            return Err(RaffleError::internal(format!(
                "custody holds {} sats, cannot transfer {}",
                self.balance.to_sat(),
                amount.to_sat()
            )));
        }

        let receipt = match self.sink.credit(to, amount).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!("payout of {} sats to {} rejected: {}", amount.to_sat(), to, e);
                return Err(RaffleError::TransferFailed {
                    to,
                    amount: amount.to_sat(),
                    reason: e.to_string(),
                });
            }
        };

        self.balance = self.balance - amount;
        tracing::info!(
            "paid {} sats to {} (receipt {})",
            amount.to_sat(),
            to,
            receipt
        );
        Ok(receipt)
    }
}

impl std::fmt::Debug for FundCustody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FundCustody")
            .field("balance", &self.balance)
            .finish()
    }
}

/// In-process sink for tests and local simulation. Records credited totals
/// per participant and can be switched to reject transfers.
#[derive(Default)]
pub struct MemorySink {
    credited: Mutex<HashMap<Uuid, Amount>>,
    reject: Mutex<bool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reject(&self, reject: bool) {
        *self.reject.lock() = reject;
    }

    pub fn credited(&self, to: Uuid) -> Amount {
        self.credited
            .lock()
            .get(&to)
            .copied()
            .unwrap_or(Amount::ZERO)
    }
}

#[async_trait]
impl PayoutSink for MemorySink {
    async fn credit(&self, to: Uuid, amount: Amount) -> Result<String> {
        if *self.reject.lock() {
            return Err(RaffleError::internal("recipient rejected the transfer"));
        }

        let mut credited = self.credited.lock();
        let total = credited.entry(to).or_insert(Amount::ZERO);
        *total = *total + amount;

        Ok(format!("memsink-{}", Uuid::new_v4()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposits_accumulate() {
        let sink = Arc::new(MemorySink::new());
        let mut custody = FundCustody::new(sink);

        custody.deposit(Amount::from_sat(100));
        custody.deposit(Amount::from_sat(100));

        assert_eq!(custody.balance(), Amount::from_sat(200));
    }

    #[tokio::test]
    async fn transfer_debits_pool_and_credits_recipient() {
        let sink = Arc::new(MemorySink::new());
        let mut custody = FundCustody::new(sink.clone());
        let winner = Uuid::new_v4();

        custody.deposit(Amount::from_sat(300));
        let receipt = custody
            .transfer(winner, Amount::from_sat(300))
            .await
            .unwrap();

        assert!(receipt.starts_with("memsink-"));
        assert_eq!(custody.balance(), Amount::ZERO);
        assert_eq!(sink.credited(winner), Amount::from_sat(300));
    }

    #[tokio::test]
    async fn rejected_transfer_leaves_balance_untouched() {
        let sink = Arc::new(MemorySink::new());
        let mut custody = FundCustody::new(sink.clone());
        let winner = Uuid::new_v4();

        custody.deposit(Amount::from_sat(300));
        sink.set_reject(true);

        let err = custody
            .transfer(winner, Amount::from_sat(300))
            .await
            .unwrap_err();
        assert!(matches!(err, RaffleError::TransferFailed { .. }));
        assert_eq!(custody.balance(), Amount::from_sat(300));
        assert_eq!(sink.credited(winner), Amount::ZERO);
    }

    #[tokio::test]
    async fn transfer_above_balance_is_refused() {
        let sink = Arc::new(MemorySink::new());
        let mut custody = FundCustody::new(sink);

        custody.deposit(Amount::from_sat(100));
        let err = custody
            .transfer(Uuid::new_v4(), Amount::from_sat(200))
            .await
            .unwrap_err();

        assert!(matches!(err, RaffleError::Internal(_)));
        assert_eq!(custody.balance(), Amount::from_sat(100));
    }
}
