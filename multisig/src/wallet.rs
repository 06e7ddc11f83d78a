//! Threshold approval wallet
//!
//! Pooled funds leave custody only through an N-of-M state machine:
//! a transaction is requested under a caller-chosen id (ids are never
//! recycled), collects approvals from distinct approvers, and executes the
//! transfer exactly once when the count reaches the threshold in force at
//! that moment. Requesters who also hold the approver capability register
//! their own approval as a side effect of the request; that coupling is
//! kept for compatibility and lives entirely in `register_approval`.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use halcyon_core::{AccessControl, Capability, Settlement};

use crate::error::{MultisigError, Result};

/// One requested fund release. Immutable after execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletTransaction {
    pub id: u64,
    pub beneficiary: String,
    pub amount: u128,
    pub approvals: u32,
    pub executed: bool,
    pub approved_by: HashSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultisigWallet {
    txs: HashMap<u64, WalletTransaction>,
    required_approvals: u32,
}

impl MultisigWallet {
    pub fn new(required_approvals: u32) -> Self {
        Self {
            txs: HashMap::new(),
            required_approvals: required_approvals.max(1),
        }
    }

    pub fn transaction(&self, id: u64) -> Option<&WalletTransaction> {
        self.txs.get(&id)
    }

    pub fn required_approvals(&self) -> u32 {
        self.required_approvals
    }

    fn require(
        &self,
        caller: &str,
        acl: &dyn AccessControl,
        capability: Capability,
    ) -> Result<()> {
        if !acl.has_capability(caller, capability) {
            return Err(MultisigError::Unauthorized {
                caller: caller.to_string(),
                capability,
            });
        }
        Ok(())
    }

    /// Request a release of `amount` to `beneficiary` under `id`. A
    /// requester who also holds the approver capability counts as the first
    /// approval, which executes immediately under a threshold of one.
    pub fn request(
        &mut self,
        caller: &str,
        acl: &dyn AccessControl,
        id: u64,
        beneficiary: &str,
        amount: u128,
        settlement: &mut dyn Settlement,
    ) -> Result<()> {
        self.require(caller, acl, Capability::Requester)?;

        if self.txs.contains_key(&id) {
            return Err(MultisigError::TransactionExists(id));
        }
        self.txs.insert(
            id,
            WalletTransaction {
                id,
                beneficiary: beneficiary.to_string(),
                amount,
                approvals: 0,
                executed: false,
                approved_by: HashSet::new(),
            },
        );
        debug!("tx {} requested: {} to {}", id, amount, beneficiary);

        if acl.has_capability(caller, Capability::Approver) {
            self.register_approval(id, caller, settlement)?;
        }
        Ok(())
    }

    /// Approve transaction `id`. Reaching the threshold executes the
    /// transfer in the same transition.
    pub fn approve(
        &mut self,
        caller: &str,
        acl: &dyn AccessControl,
        id: u64,
        settlement: &mut dyn Settlement,
    ) -> Result<()> {
        self.require(caller, acl, Capability::Approver)?;
        self.register_approval(id, caller, settlement)
    }

    /// The single path that counts an approval, shared by `approve` and the
    /// requester auto-approval. Execution and the count increment are one
    /// transition: a failed transfer unwinds the registration.
    fn register_approval(
        &mut self,
        id: u64,
        approver: &str,
        settlement: &mut dyn Settlement,
    ) -> Result<()> {
        let required = self.required_approvals;
        let tx = self
            .txs
            .get_mut(&id)
            .ok_or(MultisigError::TransactionNotFound(id))?;
        if tx.executed {
            return Err(MultisigError::TransactionAlreadyExecuted(id));
        }
        if !tx.approved_by.insert(approver.to_string()) {
            return Err(MultisigError::AlreadyApproved {
                id,
                approver: approver.to_string(),
            });
        }
        tx.approvals += 1;

        if tx.approvals >= required {
            if let Err(e) = settlement.transfer_out(&tx.beneficiary, tx.amount) {
                tx.approved_by.remove(approver);
                tx.approvals -= 1;
                return Err(e.into());
            }
            tx.executed = true;
            info!("tx {} executed: {} to {}", id, tx.amount, tx.beneficiary);
        } else {
            debug!("tx {} approved by {} ({}/{})", id, approver, tx.approvals, required);
        }
        Ok(())
    }

    /// Change the threshold for future approval evaluation. Never
    /// un-executes anything already executed.
    pub fn set_required_approvals(
        &mut self,
        caller: &str,
        acl: &dyn AccessControl,
        required: u32,
    ) -> Result<()> {
        self.require(caller, acl, Capability::Admin)?;
        if required == 0 {
            return Err(MultisigError::InvalidThreshold);
        }
        self.required_approvals = required;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halcyon_core::{CapabilityRegistry, TokenVault};

    fn setup() -> (CapabilityRegistry, TokenVault) {
        let mut acl = CapabilityRegistry::new();
        acl.grant("owner", Capability::Admin);
        acl.grant("requester", Capability::Requester);
        for approver in ["dual", "approver2", "approver3"] {
            acl.grant(approver, Capability::Approver);
        }
        acl.grant("dual", Capability::Requester);

        let mut vault = TokenVault::new("wallet");
        vault.mint("wallet", 1_000_000).unwrap();
        (acl, vault)
    }

    #[test]
    fn test_request_records_transaction() {
        let (acl, mut vault) = setup();
        let mut wallet = MultisigWallet::new(1);

        wallet.request("requester", &acl, 1, "receiver", 100, &mut vault).unwrap();
        let tx = wallet.transaction(1).unwrap();
        assert_eq!(tx.beneficiary, "receiver");
        assert_eq!(tx.amount, 100);
        assert_eq!(tx.approvals, 0);
        assert!(!tx.executed);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let (acl, mut vault) = setup();
        let mut wallet = MultisigWallet::new(1);

        wallet.request("requester", &acl, 1, "receiver", 100, &mut vault).unwrap();
        // Different beneficiary and amount changes nothing: the id is spent.
        let err = wallet
            .request("requester", &acl, 1, "other", 5, &mut vault)
            .unwrap_err();
        assert_eq!(err, MultisigError::TransactionExists(1));
    }

    #[test]
    fn test_dual_role_request_auto_approves_and_executes() {
        let (acl, mut vault) = setup();
        let mut wallet = MultisigWallet::new(1);

        wallet.request("dual", &acl, 2, "receiver", 100, &mut vault).unwrap();
        let tx = wallet.transaction(2).unwrap();
        assert_eq!(tx.approvals, 1);
        assert!(tx.executed);
        assert_eq!(vault.balance_of("receiver"), 100);
    }

    #[test]
    fn test_unknown_transaction() {
        let (acl, mut vault) = setup();
        let mut wallet = MultisigWallet::new(1);
        assert_eq!(
            wallet.approve("approver2", &acl, 9, &mut vault).unwrap_err(),
            MultisigError::TransactionNotFound(9)
        );
    }

    #[test]
    fn test_threshold_zero_rejected() {
        let (acl, _vault) = setup();
        let mut wallet = MultisigWallet::new(2);
        assert_eq!(
            wallet.set_required_approvals("owner", &acl, 0).unwrap_err(),
            MultisigError::InvalidThreshold
        );
        assert!(matches!(
            wallet.set_required_approvals("requester", &acl, 3).unwrap_err(),
            MultisigError::Unauthorized { .. }
        ));
    }

    #[test]
    fn test_failed_transfer_unwinds_approval() {
        let (acl, _) = setup();
        // Empty wallet vault: execution must fail.
        let mut vault = TokenVault::new("wallet");
        let mut wallet = MultisigWallet::new(1);

        wallet.request("requester", &acl, 1, "receiver", 100, &mut vault).unwrap();
        let err = wallet.approve("approver2", &acl, 1, &mut vault).unwrap_err();
        assert!(matches!(err, MultisigError::PaymentTransferFailed(_)));

        // The approval did not stick, so it can be retried once funded.
        let tx = wallet.transaction(1).unwrap();
        assert_eq!(tx.approvals, 0);
        assert!(!tx.executed);

        vault.mint("wallet", 100).unwrap();
        wallet.approve("approver2", &acl, 1, &mut vault).unwrap();
        assert!(wallet.transaction(1).unwrap().executed);
        assert_eq!(vault.balance_of("receiver"), 100);
    }
}
