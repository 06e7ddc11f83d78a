//! Halcyon core primitives
//!
//! Shared building blocks for the distribution engines:
//! - token vault and the `Settlement` interface used for all fund movement
//! - injected `Clock` so time-based logic is testable
//! - capability registry gating admin operations

pub mod access;
pub mod clock;
pub mod settlement;

pub use access::{AccessControl, Capability, CapabilityRegistry};
pub use clock::{Clock, ManualClock, SystemClock};
pub use settlement::{PaymentError, Settlement, TokenVault};

/// Smallest-unit scale of the token (8 decimal places).
pub const TOKEN_UNIT: u128 = 100_000_000;
