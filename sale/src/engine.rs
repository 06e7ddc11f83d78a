//! Staged sale engine
//!
//! Sequential time-boxed stages over one allocation ledger. The active stage
//! is the latest one whose start date has passed; its price, purchase
//! bounds, and schedule durations govern every vest and buy. Capacity is
//! reserved in a single test-and-set step before any payment moves, and a
//! failed payment unwinds the reservation in the same call, so no operation
//! ever leaves partial state behind.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use halcyon_core::{AccessControl, Capability, Clock, Settlement, TOKEN_UNIT};
use vesting::{VestingError, VestingLedger};

use crate::error::{Result, SaleError};
use crate::stage::{SaleStage, StageConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedSale {
    stages: Vec<SaleStage>,
    ledger: VestingLedger,
    /// Percent of every allocation paid as the cliff.
    locked_fraction_pct: u128,
    /// Payment units collected from purchases, awaiting withdrawal.
    collected: u128,
}

impl StagedSale {
    pub fn new(locked_fraction_pct: u128) -> Self {
        Self {
            stages: Vec::new(),
            ledger: VestingLedger::new(),
            locked_fraction_pct,
            collected: 0,
        }
    }

    pub fn stages(&self) -> &[SaleStage] {
        &self.stages
    }

    pub fn ledger(&self) -> &VestingLedger {
        &self.ledger
    }

    pub fn collected(&self) -> u128 {
        self.collected
    }

    fn require(
        &self,
        caller: &str,
        acl: &dyn AccessControl,
        capability: Capability,
    ) -> Result<()> {
        if !acl.has_capability(caller, capability) {
            return Err(SaleError::Unauthorized {
                caller: caller.to_string(),
                capability,
            });
        }
        Ok(())
    }

    /// Append a stage. Stages must be added in strictly increasing start
    /// order so the active-stage rule stays unambiguous.
    pub fn add_stage(
        &mut self,
        caller: &str,
        acl: &dyn AccessControl,
        config: StageConfig,
    ) -> Result<()> {
        self.require(caller, acl, Capability::Admin)?;

        if let Some(previous) = self.stages.last() {
            if config.start_date <= previous.config.start_date {
                return Err(SaleError::StageOverlap {
                    start_date: config.start_date,
                    previous: previous.config.start_date,
                });
            }
        }

        info!(
            "stage added: starts {}, cap {}, price {}",
            config.start_date, config.max_allocation, config.token_price
        );
        self.stages.push(SaleStage::new(config));
        Ok(())
    }

    /// Latest stage whose start date has passed.
    pub fn current_stage_index(&self, now: u64) -> Option<usize> {
        self.stages
            .iter()
            .rposition(|stage| stage.config.start_date <= now)
    }

    /// The active stage, if any.
    pub fn stage_info(&self, clock: &dyn Clock) -> Option<&SaleStage> {
        self.current_stage_index(clock.now())
            .map(|idx| &self.stages[idx])
    }

    /// Record the token generation event from which every schedule runs.
    pub fn trigger(
        &mut self,
        caller: &str,
        acl: &dyn AccessControl,
        timestamp: u64,
    ) -> Result<()> {
        self.require(caller, acl, Capability::Admin)?;
        self.ledger.trigger(timestamp)?;
        Ok(())
    }

    /// Paymentless allocation against the active stage.
    pub fn vest(
        &mut self,
        caller: &str,
        acl: &dyn AccessControl,
        beneficiary: &str,
        amount: u128,
        clock: &dyn Clock,
    ) -> Result<()> {
        self.require(caller, acl, Capability::Vester)?;

        let idx = self
            .current_stage_index(clock.now())
            .ok_or(SaleError::NoActiveStage)?;
        let (lock_duration, vest_duration) = {
            let config = &self.stages[idx].config;
            (config.lock_duration, config.vest_duration)
        };

        self.stages[idx].reserve(amount)?;
        if let Err(e) = self.ledger.grant(
            beneficiary,
            amount,
            self.locked_fraction_pct,
            lock_duration,
            vest_duration,
        ) {
            self.stages[idx].unreserve(amount);
            return Err(e.into());
        }

        debug!("vested {} for {} in stage {}", amount, beneficiary, idx);
        Ok(())
    }

    /// Purchase against the active stage. All bookkeeping commits before the
    /// payment pull, which is the last operation; a failed pull unwinds the
    /// reservation, the record, and the collected total in the same call.
    pub fn buy(
        &mut self,
        buyer: &str,
        amount: u128,
        clock: &dyn Clock,
        payment: &mut dyn Settlement,
    ) -> Result<()> {
        let idx = self
            .current_stage_index(clock.now())
            .ok_or(SaleError::NoActiveStage)?;
        let (cost, lock_duration, vest_duration) = {
            let stage = &self.stages[idx];
            stage.check_purchase_bounds(amount)?;
            let price = stage.config.token_price;
            let cost = if price == 0 {
                0
            } else {
                // Cost rounds up so a dust purchase is never free, and the
                // admissible amount is bounded so the product stays in u128.
                let maximum = (u128::MAX - (TOKEN_UNIT - 1)) / price;
                if amount > maximum {
                    return Err(SaleError::AmountTooLarge { amount, maximum });
                }
                (amount * price + TOKEN_UNIT - 1) / TOKEN_UNIT
            };
            (cost, stage.config.lock_duration, stage.config.vest_duration)
        };

        self.stages[idx].reserve(amount)?;
        if let Err(e) = self.ledger.grant(
            buyer,
            amount,
            self.locked_fraction_pct,
            lock_duration,
            vest_duration,
        ) {
            self.stages[idx].unreserve(amount);
            return Err(e.into());
        }
        self.collected += cost;

        if let Err(e) = payment.transfer_in(buyer, cost) {
            self.collected -= cost;
            self.ledger.rescind(buyer);
            self.stages[idx].unreserve(amount);
            return Err(SaleError::PaymentTransferFailed(e));
        }

        info!("{} bought {} for {} payment units", buyer, amount, cost);
        Ok(())
    }

    /// Release everything currently claimable by `beneficiary`.
    pub fn release(
        &mut self,
        beneficiary: &str,
        clock: &dyn Clock,
        settlement: &mut dyn Settlement,
    ) -> Result<u128> {
        self.ledger
            .release(beneficiary, clock.now(), settlement)
            .map_err(|e| match e {
                VestingError::PaymentTransferFailed(p) => SaleError::PaymentTransferFailed(p),
                other => other.into(),
            })
    }

    /// Amount claimable by `beneficiary` right now.
    pub fn releasable(&self, beneficiary: &str, clock: &dyn Clock) -> Result<u128> {
        Ok(self.ledger.releasable(beneficiary, clock.now())?)
    }

    pub fn pause(&mut self, caller: &str, acl: &dyn AccessControl) -> Result<()> {
        self.require(caller, acl, Capability::Pauser)?;
        self.ledger.pause();
        Ok(())
    }

    pub fn unpause(&mut self, caller: &str, acl: &dyn AccessControl) -> Result<()> {
        self.require(caller, acl, Capability::Pauser)?;
        self.ledger.unpause();
        Ok(())
    }

    /// Sweep collected payment funds to `to`.
    pub fn withdraw(
        &mut self,
        caller: &str,
        acl: &dyn AccessControl,
        to: &str,
        payment: &mut dyn Settlement,
    ) -> Result<u128> {
        self.require(caller, acl, Capability::Admin)?;

        let amount = self.collected;
        if amount == 0 {
            return Ok(0);
        }
        payment
            .transfer_out(to, amount)
            .map_err(SaleError::PaymentTransferFailed)?;
        self.collected = 0;

        info!("withdrew {} payment units to {}", amount, to);
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halcyon_core::{CapabilityRegistry, ManualClock, TokenVault};

    fn admin_registry() -> CapabilityRegistry {
        let mut acl = CapabilityRegistry::new();
        acl.grant("admin", Capability::Admin);
        acl.grant("admin", Capability::Vester);
        acl.grant("admin", Capability::Pauser);
        acl
    }

    fn config(start_date: u64) -> StageConfig {
        StageConfig {
            start_date,
            lock_duration: 100,
            vest_duration: 1100,
            token_price: 5 * TOKEN_UNIT / 100, // 0.05 payment per token
            max_allocation: 1000 * TOKEN_UNIT,
            min_purchase: None,
            max_purchase: None,
        }
    }

    #[test]
    fn test_add_stage_requires_admin() {
        let mut sale = StagedSale::new(10);
        let acl = admin_registry();

        let err = sale.add_stage("mallory", &acl, config(100)).unwrap_err();
        assert!(matches!(err, SaleError::Unauthorized { .. }));

        sale.add_stage("admin", &acl, config(100)).unwrap();
        assert_eq!(sale.stages().len(), 1);
    }

    #[test]
    fn test_stages_must_be_ordered() {
        let mut sale = StagedSale::new(10);
        let acl = admin_registry();

        sale.add_stage("admin", &acl, config(100)).unwrap();
        let err = sale.add_stage("admin", &acl, config(100)).unwrap_err();
        assert_eq!(
            err,
            SaleError::StageOverlap {
                start_date: 100,
                previous: 100
            }
        );

        sale.add_stage("admin", &acl, config(101)).unwrap();
        assert_eq!(sale.stages().len(), 2);
    }

    #[test]
    fn test_current_stage_is_latest_started() {
        let mut sale = StagedSale::new(10);
        let acl = admin_registry();
        sale.add_stage("admin", &acl, config(100)).unwrap();
        sale.add_stage("admin", &acl, config(200)).unwrap();

        assert_eq!(sale.current_stage_index(99), None);
        assert_eq!(sale.current_stage_index(100), Some(0));
        assert_eq!(sale.current_stage_index(199), Some(0));
        assert_eq!(sale.current_stage_index(200), Some(1));
        assert_eq!(sale.current_stage_index(u64::MAX), Some(1));
    }

    #[test]
    fn test_buy_before_any_stage_fails() {
        let mut sale = StagedSale::new(10);
        let clock = ManualClock::new(50);
        let mut payment = TokenVault::new("fund");

        let err = sale.buy("buyer", 100, &clock, &mut payment).unwrap_err();
        assert_eq!(err, SaleError::NoActiveStage);
    }

    #[test]
    fn test_failed_payment_unwinds_reservation() {
        let mut sale = StagedSale::new(10);
        let acl = admin_registry();
        sale.add_stage("admin", &acl, config(100)).unwrap();

        let clock = ManualClock::new(100);
        // Buyer has no funds.
        let mut payment = TokenVault::new("fund");

        let err = sale
            .buy("buyer", 100 * TOKEN_UNIT, &clock, &mut payment)
            .unwrap_err();
        assert!(matches!(err, SaleError::PaymentTransferFailed(_)));
        assert_eq!(sale.stages()[0].allocated, 0);
        assert!(sale.ledger().record("buyer").is_none());
        assert_eq!(sale.collected(), 0);

        // Nothing stuck, so the same purchase goes through once funded.
        payment.mint("buyer", 5 * TOKEN_UNIT).unwrap();
        sale.buy("buyer", 100 * TOKEN_UNIT, &clock, &mut payment).unwrap();
        assert_eq!(sale.stages()[0].allocated, 100 * TOKEN_UNIT);
        assert_eq!(sale.collected(), 5 * TOKEN_UNIT);
    }

    #[test]
    fn test_buy_rejects_amount_that_overflows_cost() {
        let mut sale = StagedSale::new(10);
        let acl = admin_registry();
        sale.add_stage("admin", &acl, config(100)).unwrap();

        let clock = ManualClock::new(100);
        let mut payment = TokenVault::new("fund");

        let err = sale.buy("buyer", u128::MAX, &clock, &mut payment).unwrap_err();
        assert!(matches!(err, SaleError::AmountTooLarge { .. }));
        assert_eq!(sale.stages()[0].allocated, 0);
        assert!(sale.ledger().record("buyer").is_none());
    }

    #[test]
    fn test_dust_purchase_is_not_free() {
        let mut sale = StagedSale::new(10);
        let acl = admin_registry();
        sale.add_stage("admin", &acl, config(100)).unwrap();

        let clock = ManualClock::new(100);
        let mut payment = TokenVault::new("fund");

        // One smallest token unit at 0.05: the cost rounds up to one payment
        // unit instead of flooring to zero, so an unfunded buyer is refused.
        let err = sale.buy("buyer", 1, &clock, &mut payment).unwrap_err();
        assert!(matches!(err, SaleError::PaymentTransferFailed(_)));

        payment.mint("buyer", 1).unwrap();
        sale.buy("buyer", 1, &clock, &mut payment).unwrap();
        assert_eq!(sale.collected(), 1);
        assert_eq!(payment.balance_of("buyer"), 0);
    }
}
