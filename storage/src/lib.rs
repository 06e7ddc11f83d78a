//! Halcyon Storage Layer
//!
//! File-based snapshots of engine state: every payload is saved twice, as
//! schema-versioned JSON (readable, migratable) and as bincode (fast load
//! path). Loading prefers bincode and falls back to JSON, where older
//! schema versions are migrated explicitly.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod schema;

use multisig::MultisigWallet;
use sale::StagedSale;
use schema::{Envelope, SALE_SCHEMA_VERSION, WALLET_SCHEMA_VERSION};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("unsupported schema version {found}, supported up to {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Directory-backed snapshot store.
pub struct Store {
    data_dir: PathBuf,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data_dir = path.as_ref().to_path_buf();
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)?;
        }
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn json_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    fn bin_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.bin", name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.json_path(name).exists() || self.bin_path(name).exists()
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        for path in [self.json_path(name), self.bin_path(name)] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn save_envelope<T: Serialize>(&self, name: &str, version: u32, payload: &T) -> Result<()> {
        let envelope = Envelope::new(version, payload);

        let json = serde_json::to_string_pretty(&envelope)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(self.json_path(name), json)?;

        let bin =
            bincode::serialize(&envelope).map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(self.bin_path(name), bin)?;

        Ok(())
    }

    /// Load the raw JSON envelope for `name`.
    fn load_json_envelope(&self, name: &str) -> Result<serde_json::Value> {
        let path = self.json_path(name);
        if !path.exists() {
            return Err(StorageError::SnapshotNotFound(name.to_string()));
        }
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    fn load_bincode<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Option<Envelope<T>> {
        let data = fs::read(self.bin_path(name)).ok()?;
        bincode::deserialize(&data).ok()
    }

    pub fn save_wallet(&self, name: &str, wallet: &MultisigWallet) -> Result<()> {
        self.save_envelope(name, WALLET_SCHEMA_VERSION, wallet)
    }

    /// Load wallet state, migrating older JSON schemas through
    /// [`schema::decode_wallet`].
    pub fn load_wallet(&self, name: &str) -> Result<MultisigWallet> {
        if let Some(envelope) = self.load_bincode::<MultisigWallet>(name) {
            if envelope.version == WALLET_SCHEMA_VERSION {
                return Ok(envelope.payload);
            }
        }
        schema::decode_wallet(self.load_json_envelope(name)?)
    }

    pub fn save_sale(&self, name: &str, sale: &StagedSale) -> Result<()> {
        self.save_envelope(name, SALE_SCHEMA_VERSION, sale)
    }

    pub fn load_sale(&self, name: &str) -> Result<StagedSale> {
        if let Some(envelope) = self.load_bincode::<StagedSale>(name) {
            if envelope.version == SALE_SCHEMA_VERSION {
                return Ok(envelope.payload);
            }
        }
        let envelope = self.load_json_envelope(name)?;
        let version = envelope
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| StorageError::Serialization("envelope missing version".to_string()))?
            as u32;
        if version != SALE_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion {
                found: version,
                supported: SALE_SCHEMA_VERSION,
            });
        }
        let payload = envelope
            .get("payload")
            .cloned()
            .ok_or_else(|| StorageError::Serialization("envelope missing payload".to_string()))?;
        serde_json::from_value(payload).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}
