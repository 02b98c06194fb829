//! Test utilities for SakuraStack
//!
//! Provides utilities for integration testing against the Secret Manager
//! emulator:
//! - Start/stop a server on an ephemeral local port
//! - Wait for the server to be ready
//! - A client speaking the Secret Manager wire schema
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sakurastack_test::TestServer;
//!
//! #[tokio::test]
//! async fn test_secrets() {
//!     let server = TestServer::start().await.unwrap();
//!     let client = server.client("my-vault");
//!
//!     client.create("db-password", "hunter2").await.unwrap();
//! }
//! ```

pub mod client;
pub mod server;

pub use client::{ClientError, SecretManagerClient, SecretMeta, SecretPage, UnveiledValue};
pub use server::{TestError, TestServer};

/// Default API prefix
pub const DEFAULT_PREFIX: &str = "/api/cloud/1.1";

/// Timeout for waiting on the server
pub const STARTUP_TIMEOUT_SECS: u64 = 30;
