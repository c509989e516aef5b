use crate::config::RaffleConfig;
use crate::custody::{FundCustody, PayoutSink};
use crate::error::{RaffleError, Result};
use crate::events::RaffleEvent;
use crate::ledger::EntryLedger;
use crate::oracle::{OracleClient, RandomnessProvider, RandomnessRequest, RequestId};
use bitcoin::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Lifecycle state of the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaffleState {
    Open,
    Calculating,
}

/// Result of the settlement eligibility check. Ineligibility carries the
/// reason so an external trigger can poll without side effects and react
/// programmatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    NotOpen,
    NoEntries,
    IntervalNotElapsed { remaining: Duration },
    EmptyPool,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

impl fmt::Display for Eligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eligibility::Eligible => write!(f, "eligible for settlement"),
            Eligibility::NotOpen => write!(f, "settlement already in progress"),
            Eligibility::NoEntries => write!(f, "no entries in the current round"),
            Eligibility::IntervalNotElapsed { remaining } => {
                write!(f, "settlement interval not elapsed ({:?} remaining)", remaining)
            }
            Eligibility::EmptyPool => write!(f, "pool holds no funds"),
        }
    }
}

/// Snapshot of the round for display and monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleInfo {
    pub state: RaffleState,
    pub entry_fee: Amount,
    pub settlement_interval: Duration,
    pub participant_count: usize,
    pub pool_balance: Amount,
    pub round_start: DateTime<Utc>,
    pub pending_request: Option<RequestId>,
    pub recent_winner: Option<Uuid>,
}

/// The settlement state machine. Owns the round aggregate and is the only
/// component that closes the ledger, triggers the payout, and resets for
/// the next round.
///
/// The round cycles Open -> Calculating -> Open indefinitely. Between
/// `begin_settlement` and `on_randomness` the machine rejects new entries,
/// further settlement triggers, and any fulfillment that does not match the
/// single outstanding request id.
pub struct Raffle {
    config: RaffleConfig,
    state: RaffleState,
    ledger: EntryLedger,
    custody: FundCustody,
    oracle: OracleClient,
    round_start: DateTime<Utc>,
    pending_request: Option<RequestId>,
    recent_winner: Option<Uuid>,
    events: broadcast::Sender<RaffleEvent>,
}

impl Raffle {
    pub fn new(
        config: RaffleConfig,
        provider: Arc<dyn RandomnessProvider>,
        sink: Arc<dyn PayoutSink>,
    ) -> Result<Self> {
        config.validate()?;
        let (events, _) = broadcast::channel(64);

        Ok(Self {
            config,
            state: RaffleState::Open,
            ledger: EntryLedger::new(),
            custody: FundCustody::new(sink),
            oracle: OracleClient::new(provider),
            round_start: Utc::now(),
            pending_request: None,
            recent_winner: None,
            events,
        })
    }

    /// Admits one entry. The caller has already collected `paid`; custody
    /// accrues exactly the entry fee per accepted slot.
    pub fn enter(&mut self, participant: Uuid, paid: Amount) -> Result<()> {
        if self.state != RaffleState::Open {
            return Err(RaffleError::NotOpen);
        }

        if paid < self.config.entry_fee {
            return Err(RaffleError::InsufficientEntryFee {
                need: self.config.entry_fee.to_sat(),
                paid: paid.to_sat(),
            });
        }

        self.ledger.append(participant);
        self.custody.deposit(self.config.entry_fee);

        tracing::info!(
            "participant {} entered with {} sats ({} entries pooled)",
            participant,
            paid.to_sat(),
            self.ledger.count()
        );
        self.emit(RaffleEvent::EntryAccepted {
            participant,
            paid,
            total_entries: self.ledger.count(),
        });

        Ok(())
    }

    /// Pure settlement predicate, safe to poll at any time. Eligible iff the
    /// round is open, has at least one entry, the interval has elapsed, and
    /// custody holds funds.
    pub fn check_eligibility(&self) -> Eligibility {
        if self.state != RaffleState::Open {
            return Eligibility::NotOpen;
        }

        if self.ledger.is_empty() {
            return Eligibility::NoEntries;
        }

        let elapsed = self.elapsed();
        if elapsed < self.config.settlement_interval {
            return Eligibility::IntervalNotElapsed {
                remaining: self.config.settlement_interval - elapsed,
            };
        }

        if self.custody.balance() == Amount::ZERO {
            return Eligibility::EmptyPool;
        }

        Eligibility::Eligible
    }

    /// Closes the round to entries and issues exactly one randomness
    /// request. Re-validates eligibility first, so a stale or duplicate
    /// trigger fails with `UpkeepNotNeeded` instead of racing the window.
    pub async fn begin_settlement(&mut self) -> Result<RequestId> {
        let eligibility = self.check_eligibility();
        if !eligibility.is_eligible() {
            return Err(RaffleError::UpkeepNotNeeded(eligibility.to_string()));
        }

        self.state = RaffleState::Calculating;

        let request = RandomnessRequest {
            gas_lane: self.config.gas_lane.clone(),
            callback_gas_limit: self.config.callback_gas_limit,
            request_confirmations: self.config.request_confirmations,
            num_words: 1,
        };

        let request_id = match self.oracle.request(request).await {
            Ok(request_id) => request_id,
            Err(e) => {
                // the request never reached the provider; reopen for entries
                self.state = RaffleState::Open;
                return Err(e);
            }
        };

        self.pending_request = Some(request_id);
        tracing::info!(
            "settlement requested for {} entries, request {}",
            self.ledger.count(),
            request_id
        );
        self.emit(RaffleEvent::SettlementRequested { request_id });

        Ok(request_id)
    }

    /// Fulfillment handler, invoked when the oracle delivers the word for an
    /// outstanding request. Selects the winner by modulo over entry slots,
    /// pays out the whole pool, and reopens the round.
    ///
    /// A failed payout aborts with no mutation at all: the round stays in
    /// Calculating with entries, balance, and the outstanding request
    /// untouched, so re-driving the same fulfillment retries the transfer.
    pub async fn on_randomness(&mut self, request_id: RequestId, random_word: u64) -> Result<Uuid> {
        if !self.oracle.is_outstanding(request_id) {
            return Err(RaffleError::NonexistentRequest { request_id });
        }

        if self.state != RaffleState::Calculating || self.pending_request != Some(request_id) {
            return Err(RaffleError::UnknownRequest { request_id });
        }

        let count = self.ledger.count();
        if count == 0 {
            // entries cannot drain while Calculating; guard the modulo anyway
            return Err(RaffleError::internal("calculating round has no entries"));
        }

        let winner_index = (random_word % count as u64) as usize;
        let winner = self.ledger.get(winner_index)?;
        let prize = self.custody.balance();

        self.custody.transfer(winner, prize).await?;

        self.oracle.consume(request_id)?;
        self.recent_winner = Some(winner);
        self.ledger.reset();
        self.round_start = Utc::now();
        self.pending_request = None;
        self.state = RaffleState::Open;

        tracing::info!(
            "winner {} selected by request {}, paid {} sats",
            winner,
            request_id,
            prize.to_sat()
        );
        self.emit(RaffleEvent::WinnerSelected {
            winner,
            prize,
            request_id,
        });

        Ok(winner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RaffleEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> RaffleState {
        self.state
    }

    pub fn entry_fee(&self) -> Amount {
        self.config.entry_fee
    }

    pub fn settlement_interval(&self) -> Duration {
        self.config.settlement_interval
    }

    pub fn participant_count(&self) -> usize {
        self.ledger.count()
    }

    pub fn participant(&self, index: usize) -> Result<Uuid> {
        self.ledger.get(index)
    }

    pub fn participants(&self) -> &[Uuid] {
        self.ledger.slots()
    }

    pub fn recent_winner(&self) -> Option<Uuid> {
        self.recent_winner
    }

    pub fn pool_balance(&self) -> Amount {
        self.custody.balance()
    }

    pub fn round_start(&self) -> DateTime<Utc> {
        self.round_start
    }

    pub fn pending_request(&self) -> Option<RequestId> {
        self.pending_request
    }

    pub fn info(&self) -> RaffleInfo {
        RaffleInfo {
            state: self.state,
            entry_fee: self.config.entry_fee,
            settlement_interval: self.config.settlement_interval,
            participant_count: self.ledger.count(),
            pool_balance: self.custody.balance(),
            round_start: self.round_start,
            pending_request: self.pending_request,
            recent_winner: self.recent_winner,
        }
    }

    fn elapsed(&self) -> Duration {
        (Utc::now() - self.round_start)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    fn emit(&self, event: RaffleEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
