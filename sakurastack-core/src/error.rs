//! API error types and formatting

use serde::Serialize;
use thiserror::Error;

/// Error codes surfaced by the emulated API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Routing
    InvalidPath,
    RouteNotFound,
    MethodNotAllowed,

    // Request decoding
    MalformedBody,
    ValidationFailed,

    // Store outcomes
    ResourceNotFound,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidPath => "InvalidPath",
            Self::RouteNotFound => "RouteNotFound",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::MalformedBody => "MalformedBody",
            Self::ValidationFailed => "ValidationFailed",
            Self::ResourceNotFound => "ResourceNotFound",
            Self::Internal => "Internal",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidPath | Self::MalformedBody | Self::ValidationFailed => 400,
            Self::RouteNotFound | Self::ResourceNotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::Internal => 500,
        }
    }

    /// Whether the error is reported as a JSON `{"error": ...}` payload.
    ///
    /// Only store lookups that miss are structured; everything else is plain
    /// text.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::ResourceNotFound)
    }
}

/// API error with the message shown to the client
#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_path() -> Self {
        Self::new(ErrorCode::InvalidPath, "invalid path")
    }

    pub fn route_not_found() -> Self {
        Self::new(ErrorCode::RouteNotFound, "404 page not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(ErrorCode::MethodNotAllowed, "method not allowed")
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Format as a newline-terminated plain-text body
    pub fn to_plain_text(&self) -> String {
        format!("{}\n", self.message)
    }

    /// Format as the JSON error payload
    pub fn to_json(&self) -> String {
        #[derive(Serialize)]
        struct JsonError<'a> {
            error: &'a str,
        }

        serde_json::to_string(&JsonError {
            error: &self.message,
        })
        .unwrap_or_else(|_| format!(r#"{{"error":"{}"}}"#, self.code.as_str()))
    }
}
