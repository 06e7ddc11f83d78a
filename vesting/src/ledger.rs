//! Allocation ledger
//!
//! Tracks one vesting record per beneficiary for a scheme. Records are
//! created once, never deleted, and only their `released` counter moves
//! afterward. The lock/vest clocks of every record anchor at the scheme's
//! one-shot generation event, not at grant time: nothing is claimable until
//! the trigger fires, and all beneficiaries share the same unlock date.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use halcyon_core::Settlement;

use crate::error::{Result, VestingError};
use crate::schedule::Schedule;

/// One beneficiary's allocation under a scheme.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VestingRecord {
    pub beneficiary: String,
    /// Total that will ever vest. Immutable once set.
    pub total: u128,
    pub locked_portion: u128,
    pub vesting_portion: u128,
    /// Monotone, always `<= total`.
    pub released: u128,
    /// Seconds from the generation event to the cliff.
    pub lock_duration: u64,
    /// Seconds from the generation event to full vesting.
    pub vest_duration: u64,
    pub active: bool,
}

/// Beneficiary -> record map plus the scheme-wide generation anchor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VestingLedger {
    records: HashMap<String, VestingRecord>,
    trigger_time: Option<u64>,
    paused: bool,
}

impl VestingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, beneficiary: &str) -> Option<&VestingRecord> {
        self.records.get(beneficiary)
    }

    pub fn records(&self) -> impl Iterator<Item = &VestingRecord> {
        self.records.values()
    }

    pub fn trigger_time(&self) -> Option<u64> {
        self.trigger_time
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    /// Record the generation event. One-shot: a second call is a replay and
    /// is rejected.
    pub fn trigger(&mut self, timestamp: u64) -> Result<()> {
        if self.trigger_time.is_some() {
            return Err(VestingError::AlreadyTriggered);
        }
        self.trigger_time = Some(timestamp);
        info!("generation event triggered at {}", timestamp);
        Ok(())
    }

    /// Create the record for `beneficiary`. `locked_fraction_pct` of the
    /// amount pays out as the cliff, the rest vests linearly.
    pub fn grant(
        &mut self,
        beneficiary: &str,
        amount: u128,
        locked_fraction_pct: u128,
        lock_duration: u64,
        vest_duration: u64,
    ) -> Result<()> {
        if let Some(existing) = self.records.get(beneficiary) {
            if existing.active {
                return Err(VestingError::AlreadyVested(beneficiary.to_string()));
            }
        }

        // Percent split decomposed so the intermediate product stays within
        // u128 even for maximal amounts.
        let pct = locked_fraction_pct.min(100);
        let locked_portion = amount / 100 * pct + amount % 100 * pct / 100;
        let record = VestingRecord {
            beneficiary: beneficiary.to_string(),
            total: amount,
            locked_portion,
            vesting_portion: amount - locked_portion,
            released: 0,
            lock_duration,
            vest_duration,
            active: true,
        };
        debug!(
            "granted {} to {} (locked {}, vesting {})",
            amount, beneficiary, record.locked_portion, record.vesting_portion
        );
        self.records.insert(beneficiary.to_string(), record);
        Ok(())
    }

    /// Remove a record that has released nothing. This is the rollback arm
    /// for a grant whose surrounding operation failed later in the same
    /// call; a record with any release behind it stays put.
    pub fn rescind(&mut self, beneficiary: &str) -> bool {
        match self.records.get(beneficiary) {
            Some(record) if record.released == 0 => {
                self.records.remove(beneficiary);
                debug!("rescinded grant for {}", beneficiary);
                true
            }
            _ => false,
        }
    }

    fn schedule_of(&self, record: &VestingRecord) -> Option<Schedule> {
        let trigger = self.trigger_time?;
        Some(Schedule {
            locked_portion: record.locked_portion,
            vesting_portion: record.vesting_portion,
            unlock_time: trigger + record.lock_duration,
            end_time: trigger + record.vest_duration,
        })
    }

    /// Amount claimable at `now` net of what was already released. Zero when
    /// the generation event has not fired.
    pub fn releasable(&self, beneficiary: &str, now: u64) -> Result<u128> {
        let record = self
            .records
            .get(beneficiary)
            .ok_or_else(|| VestingError::NoVestingRecord(beneficiary.to_string()))?;
        // Saturating: a query earlier than the last release's time claims
        // nothing further, it does not underflow.
        Ok(match self.schedule_of(record) {
            Some(schedule) => schedule.releasable_amount(now).saturating_sub(record.released),
            None => 0,
        })
    }

    /// Release everything claimable at `now` to the beneficiary. The ledger
    /// commits before the transfer; a failed transfer unwinds the commit so
    /// no partial state survives the call.
    pub fn release(
        &mut self,
        beneficiary: &str,
        now: u64,
        settlement: &mut dyn Settlement,
    ) -> Result<u128> {
        if self.paused {
            return Err(VestingError::Paused);
        }
        if self.trigger_time.is_none() {
            return Err(VestingError::NotTriggeredYet);
        }

        let releasable = self.releasable(beneficiary, now)?;
        if releasable == 0 {
            return Err(VestingError::NoTokensReleasable(beneficiary.to_string()));
        }

        let record = self.records.get_mut(beneficiary).expect("record exists");
        record.released += releasable;

        if let Err(e) = settlement.transfer_out(beneficiary, releasable) {
            let record = self.records.get_mut(beneficiary).expect("record exists");
            record.released -= releasable;
            return Err(e.into());
        }

        debug!("released {} to {}", releasable, beneficiary);
        Ok(releasable)
    }
}
