//! JSON request/response types for the Secret Manager API
//!
//! These mirror the external schema field-for-field and are kept separate
//! from the storage types.

use serde::{Deserialize, Serialize};

use crate::storage::SecretSummary;

/// The `{"Secret": {...}}` wrapper around every request and response body.
///
/// A missing `Secret` field decodes as an empty payload.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct Envelope<T> {
    #[serde(rename = "Secret", default)]
    pub secret: T,
}

impl<T> Envelope<T> {
    pub fn new(secret: T) -> Self {
        Self { secret }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CreateSecretRequest {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeleteSecretRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UnveilRequest {
    pub name: String,
    /// `None` (omitted or null) and `0` select the latest version
    pub version: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretBody {
    pub name: String,
    pub latest_version: u64,
}

impl From<SecretSummary> for SecretBody {
    fn from(summary: SecretSummary) -> Self {
        Self {
            name: summary.name,
            latest_version: summary.latest_version,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnveilResponse {
    pub name: String,
    pub version: u64,
    pub value: String,
}

/// Secret listing.
///
/// Always the full result set: `From` is 0 and `Count` equals `Total`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretList {
    pub count: usize,
    pub from: usize,
    pub total: usize,
    pub secrets: Vec<SecretBody>,
}

impl From<Vec<SecretSummary>> for SecretList {
    fn from(summaries: Vec<SecretSummary>) -> Self {
        let secrets: Vec<SecretBody> = summaries.into_iter().map(SecretBody::from).collect();
        Self {
            count: secrets.len(),
            from: 0,
            total: secrets.len(),
            secrets,
        }
    }
}
