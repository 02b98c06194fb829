//! Secret Manager in-memory storage

use parking_lot::RwLock;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::keys::{KeyError, KeySource, OsKeySource, SecretKey};

/// Name and latest version of a live secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSummary {
    pub name: String,
    pub latest_version: u64,
}

/// A revealed secret value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnveiledSecret {
    /// The bytes originally written
    pub value: Vec<u8>,
    /// The concrete version that was resolved
    pub version: u64,
}

/// A secret with its version history
#[derive(Debug)]
struct Secret {
    key: SecretKey,
    /// Obfuscated values; version `n` lives at index `n - 1`
    versions: Vec<Vec<u8>>,
}

impl Secret {
    fn new(key: SecretKey) -> Self {
        Self {
            key,
            versions: Vec::new(),
        }
    }

    fn latest_version(&self) -> u64 {
        self.versions.len() as u64
    }

    fn push(&mut self, value: &[u8]) -> u64 {
        self.versions.push(self.key.apply(value));
        self.latest_version()
    }

    fn reveal(&self, version: u64) -> Option<Vec<u8>> {
        let index = usize::try_from(version.checked_sub(1)?).ok()?;
        self.versions.get(index).map(|hidden| self.key.apply(hidden))
    }
}

/// Secrets of one vault, ordered by name
#[derive(Debug, Default)]
struct Vault {
    secrets: BTreeMap<String, Secret>,
}

/// In-memory, vault-scoped secret storage
///
/// A single reader/writer lock covers every vault. Reads share it, writes
/// hold it exclusively, so version numbers for one secret are handed out
/// strictly one after another.
pub struct SecretStore {
    vaults: RwLock<HashMap<String, Vault>>,
    keys: Arc<dyn KeySource>,
}

impl SecretStore {
    pub fn new() -> Self {
        Self::with_key_source(Arc::new(OsKeySource))
    }

    pub fn with_key_source(keys: Arc<dyn KeySource>) -> Self {
        Self {
            vaults: RwLock::new(HashMap::new()),
            keys,
        }
    }

    /// List the live secrets of a vault, sorted by name
    pub fn list(&self, vault_id: &str) -> Vec<SecretSummary> {
        let vaults = self.vaults.read();
        vaults
            .get(vault_id)
            .map(|vault| {
                vault
                    .secrets
                    .iter()
                    .map(|(name, secret)| SecretSummary {
                        name: name.clone(),
                        latest_version: secret.latest_version(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Write a new version, creating the vault and secret on demand.
    ///
    /// Returns the version number assigned to `value`.
    pub fn create(
        &self,
        vault_id: &str,
        name: &str,
        value: impl AsRef<[u8]>,
    ) -> Result<u64, SecretManagerError> {
        let mut vaults = self.vaults.write();
        let vault = vaults.entry(vault_id.to_string()).or_default();
        let secret = match vault.secrets.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(Secret::new(self.keys.generate_key()?)),
        };
        Ok(secret.push(value.as_ref()))
    }

    /// Reveal a version of a secret.
    ///
    /// Version `0` means the latest. Negative versions never exist.
    pub fn unveil(
        &self,
        vault_id: &str,
        name: &str,
        version: i64,
    ) -> Result<UnveiledSecret, SecretManagerError> {
        let vaults = self.vaults.read();
        let secret = vaults
            .get(vault_id)
            .and_then(|vault| vault.secrets.get(name))
            .ok_or_else(|| SecretManagerError::SecretNotFound(name.to_string()))?;

        let not_found = || SecretManagerError::VersionNotFound {
            name: name.to_string(),
            version,
        };
        let resolved = match u64::try_from(version) {
            Ok(0) => secret.latest_version(),
            Ok(requested) => requested,
            Err(_) => return Err(not_found()),
        };
        let value = secret.reveal(resolved).ok_or_else(not_found)?;

        Ok(UnveiledSecret {
            value,
            version: resolved,
        })
    }

    /// Remove a secret and its whole history
    pub fn delete(&self, vault_id: &str, name: &str) -> Result<(), SecretManagerError> {
        let mut vaults = self.vaults.write();
        vaults
            .get_mut(vault_id)
            .and_then(|vault| vault.secrets.remove(name))
            .map(|_| ())
            .ok_or_else(|| SecretManagerError::SecretNotFound(name.to_string()))
    }
}

impl Default for SecretStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Secret Manager errors
#[derive(Debug, thiserror::Error)]
pub enum SecretManagerError {
    #[error("secret {0:?} not found")]
    SecretNotFound(String),

    #[error("secret {name:?} version {version} not found")]
    VersionNotFound { name: String, version: i64 },

    #[error("failed to generate encryption key: {0}")]
    KeyGeneration(#[from] KeyError),
}
