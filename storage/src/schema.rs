//! Schema versioning and migrations
//!
//! Every persisted payload is wrapped in a versioned envelope. Replacing
//! engine code never reinterprets old fields in place: loading an older
//! schema goes through an explicit migration that rewrites the payload
//! field by field before deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use multisig::MultisigWallet;

use crate::{Result, StorageError};

/// Current wallet schema. v1 carried only an approval counter per
/// transaction; v2 added the `approved_by` set.
pub const WALLET_SCHEMA_VERSION: u32 = 2;

/// Current sale schema.
pub const SALE_SCHEMA_VERSION: u32 = 1;

/// Versioned wrapper written around every persisted payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub version: u32,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(version: u32, payload: T) -> Self {
        Self { version, payload }
    }
}

/// Decode a wallet envelope parsed from JSON, migrating older schemas.
pub fn decode_wallet(envelope: Value) -> Result<MultisigWallet> {
    let version = envelope
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| StorageError::Serialization("envelope missing version".to_string()))?
        as u32;
    let payload = envelope
        .get("payload")
        .cloned()
        .ok_or_else(|| StorageError::Serialization("envelope missing payload".to_string()))?;

    let payload = match version {
        1 => migrate_wallet_v1(payload)?,
        WALLET_SCHEMA_VERSION => payload,
        found => {
            return Err(StorageError::UnsupportedVersion {
                found,
                supported: WALLET_SCHEMA_VERSION,
            })
        }
    };

    serde_json::from_value(payload).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// v1 -> v2: transactions gain an `approved_by` set. The identities behind
/// historical approvals were never recorded, so the set starts empty while
/// the counter keeps its value.
fn migrate_wallet_v1(mut payload: Value) -> Result<Value> {
    let txs = payload
        .get_mut("txs")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| StorageError::Serialization("v1 payload missing txs".to_string()))?;
    for tx in txs.values_mut() {
        let tx = tx
            .as_object_mut()
            .ok_or_else(|| StorageError::Serialization("v1 transaction not an object".to_string()))?;
        tx.entry("approved_by").or_insert_with(|| Value::Array(Vec::new()));
    }
    Ok(payload)
}
