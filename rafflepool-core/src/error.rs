use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, RaffleError>;

#[derive(Error, Debug)]
pub enum RaffleError {
    #[error("raffle is not open for entries")]
    NotOpen,

    #[error("insufficient entry fee: need {need} sats, paid {paid} sats")]
    InsufficientEntryFee { need: u64, paid: u64 },

    #[error("entry index {index} out of range ({len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("upkeep not needed: {0}")]
    UpkeepNotNeeded(String),

    #[error("unknown randomness request: {request_id}")]
    UnknownRequest { request_id: u64 },

    #[error("nonexistent randomness request: {request_id}")]
    NonexistentRequest { request_id: u64 },

    #[error("transfer of {amount} sats to {to} failed: {reason}")]
    TransferFailed { to: Uuid, amount: u64, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl RaffleError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
