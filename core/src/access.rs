//! Capability checks
//!
//! Engines gate privileged operations on named capabilities and never
//! hard-code caller identities. Resolution of who holds what lives outside
//! the engines; [`CapabilityRegistry`] is the in-process implementation.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Named capabilities consumed by the engines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Stage management, trigger, threshold changes, withdrawals.
    Admin,
    /// Paymentless allocation of vesting records.
    Vester,
    /// Suspending and resuming releases.
    Pauser,
    /// Requesting multisig transactions.
    Requester,
    /// Approving multisig transactions.
    Approver,
}

/// Answers "does this caller hold this capability".
pub trait AccessControl {
    fn has_capability(&self, caller: &str, capability: Capability) -> bool;
}

/// Identity -> capability-set registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityRegistry {
    grants: HashMap<String, HashSet<Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, identity: &str, capability: Capability) {
        self.grants
            .entry(identity.to_string())
            .or_default()
            .insert(capability);
    }

    pub fn revoke(&mut self, identity: &str, capability: Capability) {
        if let Some(caps) = self.grants.get_mut(identity) {
            caps.remove(&capability);
        }
    }
}

impl AccessControl for CapabilityRegistry {
    fn has_capability(&self, caller: &str, capability: Capability) -> bool {
        self.grants
            .get(caller)
            .map(|caps| caps.contains(&capability))
            .unwrap_or(false)
    }
}
