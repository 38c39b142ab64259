use alloy::primitives::U256;
use basar_core::AppError;
use basar_storage::StoreError;
use thiserror::Error;

/// Why a handler rejected an event. A rejected event leaves the store untouched.
#[derive(Debug, Error)]
pub enum MapperError {
    #[error("unknown phase number {phase} at block {block_number} log {log_index}")]
    InvalidPhase {
        phase: u8,
        block_number: u64,
        log_index: u64,
    },

    #[error("mint quantity {quantity} out of range at block {block_number} log {log_index}")]
    QuantityOutOfRange {
        quantity: U256,
        block_number: u64,
        log_index: u64,
    },

    #[error("{what} overflows uint256 at block {block_number} log {log_index}")]
    Overflow {
        what: &'static str,
        block_number: u64,
        log_index: u64,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<MapperError> for AppError {
    fn from(err: MapperError) -> Self {
        AppError::Mapping(err.to_string())
    }
}

/// Why an event produced no writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Transfer from the zero address; the `Minted` event already covered it.
    MintTransfer,
    /// Transfer of a token that was never seen minted.
    UnknownToken,
    /// Event kept only so every ABI event has a handler.
    NotTracked,
}

/// Result of mapping one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Applied,
    Skipped(SkipReason),
}
