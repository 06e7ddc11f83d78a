//! Staged Sale Module
//!
//! Admission control, pricing, and allocation across sequential sale
//! stages, built on the vesting ledger. Private sales, presales, and
//! community sales are all this one engine with different stage
//! parameters.

pub mod engine;
pub mod error;
pub mod stage;

pub use engine::StagedSale;
pub use error::{Result, SaleError};
pub use stage::{SaleStage, StageConfig, StageStatus};
