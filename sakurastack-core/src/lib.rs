//! Core types for SakuraStack
//!
//! Error vocabulary and request identifiers shared by the emulated services
//! and the server binary.

pub mod error;
pub mod request_id;

pub use error::{ApiError, ErrorCode};
pub use request_id::{RequestId, REQUEST_ID_HEADER};
