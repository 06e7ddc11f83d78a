//! Multisig Module
//!
//! Threshold-gated custody of pooled funds: transactions are requested
//! under never-recycled ids, approved by distinct approvers, and executed
//! exactly once when the approval count meets the current threshold.

pub mod error;
pub mod wallet;

pub use error::{MultisigError, Result};
pub use wallet::{MultisigWallet, WalletTransaction};
