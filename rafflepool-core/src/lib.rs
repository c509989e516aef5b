//! Periodically settled prize pool.
//!
//! Participants pay a fixed entry fee into a pooled balance. Once the
//! settlement interval elapses with at least one entry, the pool requests a
//! random word from an external oracle, pays the whole pool to the slot the
//! word selects, and reopens for the next round.

pub mod config;
pub mod custody;
pub mod error;
pub mod events;
pub mod ledger;
pub mod oracle;
pub mod raffle;

pub use config::RaffleConfig;
pub use custody::{FundCustody, MemorySink, PayoutSink};
pub use error::{RaffleError, Result};
pub use events::RaffleEvent;
pub use ledger::EntryLedger;
pub use oracle::{
    MockCoordinator, OracleClient, RandomnessProvider, RandomnessRequest, RequestId,
};
pub use raffle::{Eligibility, Raffle, RaffleInfo, RaffleState};

pub use ::bitcoin::Amount;
