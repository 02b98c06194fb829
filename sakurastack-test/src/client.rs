//! Client for the Secret Manager API
//!
//! Speaks the wire schema directly, independent of the server's own types.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

/// Secret name and latest version, as listed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretMeta {
    pub name: String,
    pub latest_version: u64,
}

/// A page of secrets
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretPage {
    pub count: usize,
    pub from: usize,
    pub total: usize,
    pub secrets: Vec<SecretMeta>,
}

/// An unveiled secret value
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnveiledValue {
    pub name: String,
    pub version: u64,
    pub value: String,
}

#[derive(Deserialize)]
struct Wrapped<T> {
    #[serde(rename = "Secret")]
    secret: T,
}

/// Client for one vault
#[derive(Clone)]
pub struct SecretManagerClient {
    secrets_url: String,
    client: Client,
}

impl SecretManagerClient {
    /// `root_url` includes the API prefix, e.g. `http://127.0.0.1:8080/api/cloud/1.1`
    pub fn new(root_url: impl AsRef<str>, vault_id: &str) -> Self {
        Self {
            secrets_url: format!(
                "{}/secretmanager/vaults/{}/secrets",
                root_url.as_ref(),
                vault_id
            ),
            client: Client::new(),
        }
    }

    /// List the vault's secrets
    pub async fn list(&self) -> Result<SecretPage, ClientError> {
        let response = self.client.get(&self.secrets_url).send().await?;
        read_json(check(response, StatusCode::OK).await?).await
    }

    /// Create a secret or add a version to it
    pub async fn create(&self, name: &str, value: &str) -> Result<SecretMeta, ClientError> {
        let response = self
            .client
            .post(&self.secrets_url)
            .json(&json!({ "Secret": { "Name": name, "Value": value } }))
            .send()
            .await?;
        let wrapped: Wrapped<SecretMeta> =
            read_json(check(response, StatusCode::CREATED).await?).await?;
        Ok(wrapped.secret)
    }

    /// Unveil a version; `None` asks for the latest
    pub async fn unveil(
        &self,
        name: &str,
        version: Option<u64>,
    ) -> Result<UnveiledValue, ClientError> {
        let response = self
            .client
            .post(format!("{}/unveil", self.secrets_url))
            .json(&json!({ "Secret": { "Name": name, "Version": version } }))
            .send()
            .await?;
        let wrapped: Wrapped<UnveiledValue> =
            read_json(check(response, StatusCode::OK).await?).await?;
        Ok(wrapped.secret)
    }

    /// Delete a secret
    pub async fn delete(&self, name: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(&self.secrets_url)
            .json(&json!({ "Secret": { "Name": name } }))
            .send()
            .await?;
        check(response, StatusCode::NO_CONTENT).await?;
        Ok(())
    }
}

async fn check(response: Response, expected: StatusCode) -> Result<Response, ClientError> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }

    let body = response.text().await?;
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim_end().to_string());
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::ParseError(e.to_string()))
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl ClientError {
    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
