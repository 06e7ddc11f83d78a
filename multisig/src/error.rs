//! Multisig error types

use halcyon_core::{Capability, PaymentError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("caller {caller} lacks the {capability:?} capability")]
    Unauthorized {
        caller: String,
        capability: Capability,
    },

    #[error("transaction {0} already exists")]
    TransactionExists(u64),

    #[error("transaction {0} not found")]
    TransactionNotFound(u64),

    #[error("transaction {0} already executed")]
    TransactionAlreadyExecuted(u64),

    #[error("{approver} already approved transaction {id}")]
    AlreadyApproved { id: u64, approver: String },

    #[error("required approvals must be at least 1")]
    InvalidThreshold,

    #[error("payment transfer failed: {0}")]
    PaymentTransferFailed(#[from] PaymentError),
}

pub type Result<T> = std::result::Result<T, MultisigError>;
