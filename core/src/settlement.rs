//! Fund settlement
//!
//! All fund movement in and out of the engines goes through the
//! [`Settlement`] trait: `transfer_in` pulls payment from a payer into the
//! vault, `transfer_out` pays a beneficiary from the vault. Engines never
//! touch balances directly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Settlement failures. Surfaced to engines as transfer errors; the calling
/// operation must leave no partial state behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u128, available: u128 },

    #[error("balance overflow crediting {account}")]
    BalanceOverflow { account: String },
}

/// Moves funds between external accounts and the custodied pool.
pub trait Settlement {
    /// Pull `amount` from `payer` into the vault.
    fn transfer_in(&mut self, payer: &str, amount: u128) -> Result<(), PaymentError>;

    /// Pay `amount` from the vault to `payee`.
    fn transfer_out(&mut self, payee: &str, amount: u128) -> Result<(), PaymentError>;
}

/// In-process token vault: a balance map with one designated vault account
/// holding the pooled funds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenVault {
    vault_account: String,
    balances: HashMap<String, u128>,
}

impl TokenVault {
    pub fn new(vault_account: &str) -> Self {
        Self {
            vault_account: vault_account.to_string(),
            balances: HashMap::new(),
        }
    }

    pub fn balance_of(&self, account: &str) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Balance held by the vault account itself.
    pub fn pooled(&self) -> u128 {
        self.balance_of(&self.vault_account)
    }

    /// Credit newly issued units to an account.
    pub fn mint(&mut self, account: &str, amount: u128) -> Result<(), PaymentError> {
        self.credit(account, amount)
    }

    fn credit(&mut self, account: &str, amount: u128) -> Result<(), PaymentError> {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| PaymentError::BalanceOverflow {
                account: account.to_string(),
            })?;
        Ok(())
    }

    fn debit(&mut self, account: &str, amount: u128) -> Result<(), PaymentError> {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        if *balance < amount {
            return Err(PaymentError::InsufficientFunds {
                requested: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(())
    }

    fn transfer(&mut self, from: &str, to: &str, amount: u128) -> Result<(), PaymentError> {
        self.debit(from, amount)?;
        // Debit succeeded, so the credit is the only remaining step; undo the
        // debit if the credit overflows.
        if let Err(e) = self.credit(to, amount) {
            self.credit(from, amount).ok();
            return Err(e);
        }
        Ok(())
    }
}

impl Settlement for TokenVault {
    fn transfer_in(&mut self, payer: &str, amount: u128) -> Result<(), PaymentError> {
        let vault = self.vault_account.clone();
        self.transfer(payer, &vault, amount)
    }

    fn transfer_out(&mut self, payee: &str, amount: u128) -> Result<(), PaymentError> {
        let vault = self.vault_account.clone();
        self.transfer(&vault, payee, amount)
    }
}
