//! Per-secret obfuscation keys
//!
//! Stored values are XORed with a random per-secret key so the store never
//! holds plaintext directly. This is obfuscation only and offers no
//! confidentiality.

use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;

/// Length of a per-secret key in bytes
pub const KEY_LEN: usize = 32;

/// Key used to obfuscate every version of one secret
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// XOR `data` with the key repeated cyclically.
    ///
    /// The transform is its own inverse.
    pub fn apply(&self, data: &[u8]) -> Vec<u8> {
        data.iter()
            .zip(self.0.iter().cycle())
            .map(|(byte, key)| byte ^ key)
            .collect()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// Key generation failure
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct KeyError(pub String);

/// Source of fresh per-secret keys
pub trait KeySource: Send + Sync {
    fn generate_key(&self) -> Result<SecretKey, KeyError>;
}

/// Keys from the operating system's secure random generator
#[derive(Debug, Default, Clone, Copy)]
pub struct OsKeySource;

impl KeySource for OsKeySource {
    fn generate_key(&self) -> Result<SecretKey, KeyError> {
        let mut bytes = [0u8; KEY_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| KeyError(e.to_string()))?;
        Ok(SecretKey(bytes))
    }
}

/// Hands out the same key every time (for deterministic tests)
#[derive(Debug, Clone)]
pub struct FixedKeySource(SecretKey);

impl FixedKeySource {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(SecretKey(bytes))
    }
}

impl KeySource for FixedKeySource {
    fn generate_key(&self) -> Result<SecretKey, KeyError> {
        Ok(self.0.clone())
    }
}
