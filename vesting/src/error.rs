//! Vesting error types

use halcyon_core::PaymentError;
use thiserror::Error;

/// Allocation ledger and release errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VestingError {
    #[error("beneficiary {0} already has an active vesting record")]
    AlreadyVested(String),

    #[error("no vesting record for beneficiary {0}")]
    NoVestingRecord(String),

    #[error("generation event already triggered")]
    AlreadyTriggered,

    #[error("generation event has not been triggered yet")]
    NotTriggeredYet,

    #[error("no tokens releasable for beneficiary {0}")]
    NoTokensReleasable(String),

    #[error("releases are paused")]
    Paused,

    #[error("payment transfer failed: {0}")]
    PaymentTransferFailed(#[from] PaymentError),
}

pub type Result<T> = std::result::Result<T, VestingError>;
