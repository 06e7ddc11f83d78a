//! Sale engine error types

use halcyon_core::{Capability, PaymentError};
use thiserror::Error;
use vesting::VestingError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaleError {
    #[error("caller {caller} lacks the {capability:?} capability")]
    Unauthorized {
        caller: String,
        capability: Capability,
    },

    #[error("stage starting at {start_date} does not follow the previous stage at {previous}")]
    StageOverlap { start_date: u64, previous: u64 },

    #[error("no sale stage is active")]
    NoActiveStage,

    #[error("allocation exceeded: requested {requested}, available {available}")]
    AllocationExceeded { requested: u128, available: u128 },

    #[error("amount {amount} is below the minimum purchase of {minimum}")]
    AmountTooSmall { amount: u128, minimum: u128 },

    #[error("amount {amount} is above the maximum purchase of {maximum}")]
    AmountTooLarge { amount: u128, maximum: u128 },

    #[error("payment transfer failed: {0}")]
    PaymentTransferFailed(PaymentError),

    #[error(transparent)]
    Vesting(#[from] VestingError),
}

pub type Result<T> = std::result::Result<T, SaleError>;
