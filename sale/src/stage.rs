//! Sale stages
//!
//! A stage is a time-boxed sale window: price, schedule durations, and a
//! hard allocation cap. Configuration is immutable once the stage is added;
//! only the running `allocated` counter moves, and only through the
//! single-step [`SaleStage::reserve`] gate.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SaleError};

/// Immutable stage parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageConfig {
    pub start_date: u64,
    /// Seconds from the generation event to the cliff.
    pub lock_duration: u64,
    /// Seconds from the generation event to full vesting.
    pub vest_duration: u64,
    /// Payment units per whole token.
    pub token_price: u128,
    pub max_allocation: u128,
    pub min_purchase: Option<u128>,
    pub max_purchase: Option<u128>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StageStatus {
    /// Not yet started.
    Pending,
    /// Started with capacity remaining.
    Open,
    /// Allocation cap reached.
    Exhausted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaleStage {
    pub config: StageConfig,
    /// Running total of reserved allocation, never above the cap.
    pub allocated: u128,
}

impl SaleStage {
    pub fn new(config: StageConfig) -> Self {
        Self {
            config,
            allocated: 0,
        }
    }

    pub fn status(&self, now: u64) -> StageStatus {
        if now < self.config.start_date {
            StageStatus::Pending
        } else if self.allocated < self.config.max_allocation {
            StageStatus::Open
        } else {
            StageStatus::Exhausted
        }
    }

    pub fn available(&self) -> u128 {
        self.config.max_allocation - self.allocated
    }

    /// Take `amount` of capacity, checking and incrementing in one step.
    pub fn reserve(&mut self, amount: u128) -> Result<()> {
        let available = self.available();
        if amount > available {
            return Err(SaleError::AllocationExceeded {
                requested: amount,
                available,
            });
        }
        self.allocated += amount;
        Ok(())
    }

    /// Rollback arm for a reservation whose operation failed later in the
    /// same call.
    pub(crate) fn unreserve(&mut self, amount: u128) {
        debug_assert!(amount <= self.allocated);
        self.allocated -= amount;
    }

    /// Enforce the stage's per-transaction purchase bounds, where set.
    pub fn check_purchase_bounds(&self, amount: u128) -> Result<()> {
        if let Some(minimum) = self.config.min_purchase {
            if amount < minimum {
                return Err(SaleError::AmountTooSmall { amount, minimum });
            }
        }
        if let Some(maximum) = self.config.max_purchase {
            if amount > maximum {
                return Err(SaleError::AmountTooLarge { amount, maximum });
            }
        }
        Ok(())
    }
}
