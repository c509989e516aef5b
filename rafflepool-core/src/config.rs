use crate::error::{RaffleError, Result};
use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters fixed at construction time. A running raffle never changes
/// its fee, interval, or oracle routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaffleConfig {
    /// Fixed admission price per entry slot.
    pub entry_fee: Amount,
    /// Minimum round length before the pool becomes eligible for settlement.
    pub settlement_interval: Duration,
    /// Key hash routing the randomness request (32 bytes, hex encoded).
    pub gas_lane: String,
    /// Resource budget forwarded with each randomness request.
    pub callback_gas_limit: u32,
    /// Confirmations the provider waits before fulfilling.
    pub request_confirmations: u16,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            entry_fee: Amount::from_sat(10_000),
            settlement_interval: Duration::from_secs(30),
            gas_lane: "79d3d8832d904592c0bf9818b621522c988bb8b0c05cdc3b15aea1b6e8db0c15"
                .to_string(),
            callback_gas_limit: 500_000,
            request_confirmations: 3,
        }
    }
}

impl RaffleConfig {
    pub fn new(entry_fee: Amount, settlement_interval: Duration) -> Self {
        Self {
            entry_fee,
            settlement_interval,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.entry_fee == Amount::ZERO {
            return Err(RaffleError::config("entry fee must be greater than 0"));
        }

        if self.settlement_interval.is_zero() {
            return Err(RaffleError::config(
                "settlement interval must be greater than 0",
            ));
        }

        let lane = hex::decode(self.gas_lane.trim_start_matches("0x"))
            .map_err(|_| RaffleError::config("gas lane must be hex encoded"))?;
        if lane.len() != 32 {
            return Err(RaffleError::config("gas lane must encode 32 bytes"));
        }

        if self.callback_gas_limit == 0 {
            return Err(RaffleError::config(
                "callback gas limit must be greater than 0",
            ));
        }

        Ok(())
    }
}
