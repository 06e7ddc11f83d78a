//! Vesting Module
//!
//! Release-schedule arithmetic and the per-beneficiary allocation ledger.
//! A schedule is a pure function of time (cliff plus linear vesting); the
//! ledger anchors every record at a one-shot generation event and guards
//! releases against replay and partial application.

pub mod error;
pub mod ledger;
pub mod schedule;

pub use error::{Result, VestingError};
pub use ledger::{VestingLedger, VestingRecord};
pub use schedule::Schedule;
