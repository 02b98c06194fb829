//! HTTP handlers for Secret Manager

use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use sakurastack_core::{ApiError, ErrorCode};

use crate::storage::{SecretManagerError, SecretStore};
use crate::wire::{
    CreateSecretRequest, DeleteSecretRequest, Envelope, SecretBody, SecretList, UnveilRequest,
    UnveilResponse,
};

const VAULTS_PREFIX: &str = "/secretmanager/vaults/";
const SECRETS_SUFFIX: &str = "/secrets";
const UNVEIL_SUFFIX: &str = "/secrets/unveil";

/// State for Secret Manager handlers
pub struct SecretManagerState {
    pub store: Arc<SecretStore>,
    prefix: String,
}

impl SecretManagerState {
    /// `prefix` is the API root path, e.g. `/api/cloud/1.1` (no trailing slash)
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_store(Arc::new(SecretStore::new()), prefix)
    }

    pub fn with_store(store: Arc<SecretStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Mount the Secret Manager API under the state's prefix
pub fn router(state: Arc<SecretManagerState>) -> Router {
    let path = format!("{}/*path", state.prefix());
    Router::new()
        .route(&path, any(handle_request))
        .with_state(state)
}

/// Operations exposed under `/secretmanager/vaults/{id}/secrets`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListSecrets,
    CreateSecret,
    DeleteSecret,
    UnveilSecret,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListSecrets => "ListSecrets",
            Self::CreateSecret => "CreateSecret",
            Self::DeleteSecret => "DeleteSecret",
            Self::UnveilSecret => "UnveilSecret",
        }
    }
}

/// Resolve a prefix-relative path and method to an operation and vault id
pub fn resolve<'a>(path: &'a str, method: &Method) -> Result<(Operation, &'a str), ApiError> {
    if path.ends_with(UNVEIL_SUFFIX) && *method == Method::POST {
        let vault_id = extract_vault_id(path, UNVEIL_SUFFIX).ok_or_else(ApiError::invalid_path)?;
        return Ok((Operation::UnveilSecret, vault_id));
    }

    if path.ends_with(SECRETS_SUFFIX) {
        let vault_id =
            extract_vault_id(path, SECRETS_SUFFIX).ok_or_else(ApiError::invalid_path)?;
        let operation = match *method {
            Method::GET => Operation::ListSecrets,
            Method::POST => Operation::CreateSecret,
            Method::DELETE => Operation::DeleteSecret,
            _ => return Err(ApiError::method_not_allowed()),
        };
        return Ok((operation, vault_id));
    }

    Err(ApiError::route_not_found())
}

/// Vault id from `/secretmanager/vaults/{id}{suffix}`; a single non-empty segment
fn extract_vault_id<'a>(path: &'a str, suffix: &str) -> Option<&'a str> {
    let id = path.strip_suffix(suffix)?.strip_prefix(VAULTS_PREFIX)?;
    (!id.is_empty() && !id.contains('/')).then_some(id)
}

/// Handle any request under the API prefix.
///
/// Routing works on the percent-decoded path, so an encoded `/` inside a
/// vault id still splits the segment.
pub async fn handle_request(
    State(state): State<Arc<SecretManagerState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let Ok(path) = percent_decode_str(uri.path()).decode_utf8() else {
        warn!(method = %method, path = %uri.path(), "Path is not valid UTF-8 once decoded");
        return error_response(&ApiError::invalid_path());
    };
    let relative = path.strip_prefix(state.prefix()).unwrap_or(&*path);

    match resolve(relative, &method) {
        Ok((operation, vault_id)) => {
            info!(
                operation = operation.as_str(),
                vault_id = %vault_id,
                "Secret Manager request"
            );
            dispatch(&state.store, operation, vault_id, &body).unwrap_or_else(|e| {
                log_error(&e);
                error_response(&e)
            })
        }
        Err(e) => {
            warn!(method = %method, path = %path, "Unroutable request");
            error_response(&e)
        }
    }
}

fn dispatch(
    store: &SecretStore,
    operation: Operation,
    vault_id: &str,
    body: &[u8],
) -> Result<Response, ApiError> {
    match operation {
        Operation::ListSecrets => handle_list_secrets(store, vault_id),
        Operation::CreateSecret => handle_create_secret(store, vault_id, body),
        Operation::DeleteSecret => handle_delete_secret(store, vault_id, body),
        Operation::UnveilSecret => handle_unveil(store, vault_id, body),
    }
}

// === Handlers ===

fn handle_list_secrets(store: &SecretStore, vault_id: &str) -> Result<Response, ApiError> {
    let list = SecretList::from(store.list(vault_id));
    json_response(StatusCode::OK, &list)
}

fn handle_create_secret(
    store: &SecretStore,
    vault_id: &str,
    body: &[u8],
) -> Result<Response, ApiError> {
    let req: Envelope<CreateSecretRequest> = decode(body)?;
    if req.secret.name.is_empty() {
        return Err(ApiError::new(ErrorCode::ValidationFailed, "Name is required"));
    }

    let latest_version = store.create(vault_id, &req.secret.name, &req.secret.value)?;
    let response = Envelope::new(SecretBody {
        name: req.secret.name,
        latest_version,
    });
    json_response(StatusCode::CREATED, &response)
}

fn handle_delete_secret(
    store: &SecretStore,
    vault_id: &str,
    body: &[u8],
) -> Result<Response, ApiError> {
    let req: Envelope<DeleteSecretRequest> = decode(body)?;
    store.delete(vault_id, &req.secret.name)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

fn handle_unveil(store: &SecretStore, vault_id: &str, body: &[u8]) -> Result<Response, ApiError> {
    let req: Envelope<UnveilRequest> = decode(body)?;
    let unveiled = store.unveil(vault_id, &req.secret.name, req.secret.version.unwrap_or(0))?;
    let value = String::from_utf8(unveiled.value).map_err(|e| {
        ApiError::new(
            ErrorCode::Internal,
            format!("stored value is not valid UTF-8: {e}"),
        )
    })?;

    let response = Envelope::new(UnveilResponse {
        name: req.secret.name,
        version: unveiled.version,
        value,
    });
    json_response(StatusCode::OK, &response)
}

impl From<SecretManagerError> for ApiError {
    fn from(err: SecretManagerError) -> Self {
        let code = match &err {
            SecretManagerError::SecretNotFound(_) | SecretManagerError::VersionNotFound { .. } => {
                ErrorCode::ResourceNotFound
            }
            SecretManagerError::KeyGeneration(_) => ErrorCode::Internal,
        };
        ApiError::new(code, err.to_string())
    }
}

// === Helpers ===

fn decode<T: DeserializeOwned + Default>(body: &[u8]) -> Result<Envelope<T>, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        ApiError::new(
            ErrorCode::MalformedBody,
            format!("failed to parse JSON: {e}"),
        )
    })
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response, ApiError> {
    let body = serde_json::to_vec(body).map_err(|e| {
        ApiError::new(
            ErrorCode::Internal,
            format!("failed to encode response: {e}"),
        )
    })?;
    Ok((status, [(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Render an error: JSON `{"error"}` for store misses, plain text otherwise
pub fn error_response(err: &ApiError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if err.code.is_structured() {
        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            err.to_json(),
        )
            .into_response()
    } else {
        (
            status,
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            ],
            err.to_plain_text(),
        )
            .into_response()
    }
}

fn log_error(err: &ApiError) {
    if err.code == ErrorCode::Internal {
        error!(error = %err.message, "Secret Manager request failed");
    } else {
        warn!(error = %err.message, "Secret Manager request rejected");
    }
}
