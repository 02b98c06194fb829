//! Secret Manager emulation for SakuraStack
//!
//! Provides an in-memory, vault-scoped secret store behind the
//! `/secretmanager/vaults/{id}/secrets` API:
//! - ListSecrets, CreateSecret (new secret or new version), DeleteSecret
//! - UnveilSecret for the latest or a specific version
//! - Gapless per-secret version numbering under concurrent writers

pub mod handlers;
pub mod keys;
mod storage;
pub mod wire;

pub use handlers::{error_response, handle_request, router, SecretManagerState};
pub use keys::{FixedKeySource, KeySource, OsKeySource};
pub use storage::{SecretManagerError, SecretStore, SecretSummary, UnveiledSecret};
