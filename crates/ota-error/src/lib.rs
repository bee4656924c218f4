// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified error taxonomy for the OTA updates server.
//!
//! Every error raised by the core pipelines carries an [`ErrorCode`] (a
//! stable, machine-readable tag), a human-readable message, an optional
//! cause chain, and arbitrary key-value context. Use the builder returned by
//! [`OtaError::new`] to construct errors fluently.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Broad family that an [`ErrorCode`] belongs to; determines the HTTP status
/// the daemon maps it to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or missing input (400).
    InputInvalid,
    /// Missing or wrong credential (401).
    AuthFailed,
    /// Policy predicate denied the request (403).
    Forbidden,
    /// Referenced row or object does not exist (404).
    NotFound,
    /// State-machine precondition violated (409).
    Conflict,
    /// Request body exceeded a configured bound (413).
    PayloadTooLarge,
    /// Transient failure in an external collaborator (500, retryable).
    StoreUnavailable,
    /// The composer could not produce a requested signature (500).
    SigningFailed,
    /// Catch-all for unexpected internal errors (500).
    Internal,
}

impl ErrorCategory {
    /// The conventional HTTP status code for this category, per the
    /// taxonomy table in the error handling design.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InputInvalid => 400,
            Self::AuthFailed => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::PayloadTooLarge => 413,
            Self::StoreUnavailable | Self::SigningFailed | Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InputInvalid => "input_invalid",
            Self::AuthFailed => "auth_failed",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::PayloadTooLarge => "payload_too_large",
            Self::StoreUnavailable => "store_unavailable",
            Self::SigningFailed => "signing_failed",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // -- Input validation (C4, C5 header checks, JSON parse) --
    /// A required field was missing from headers/query/path/body.
    MissingField,
    /// `platform` was present but not one of the permitted values.
    InvalidPlatform,
    /// A JSON document failed to parse or did not match the expected shape.
    InvalidJson,

    // -- Auth --
    /// No credential was presented where one is required.
    AuthMissing,
    /// A presented credential did not match.
    AuthBad,

    // -- Forbidden --
    /// The asset path predicate rejected the requested key.
    AssetPathForbidden,

    // -- Not found --
    /// No application row matches the requested id.
    ApplicationNotFound,
    /// No upload row matches the requested id or coordinate.
    UploadNotFound,
    /// The requested object-store key does not exist.
    AssetNotFound,

    // -- Conflict --
    /// `release` was called on an upload already in `released` status.
    AlreadyReleased,

    // -- Payload size --
    /// The request body (or one of its multipart parts) exceeded the
    /// configured size bound.
    PayloadTooLarge,

    // -- Transient external failures --
    /// The object store did not respond, or responded with a transient
    /// error. The caller should retry the whole operation.
    ObjectStoreUnavailable,
    /// The database did not respond, or responded with a transient error.
    /// The caller should retry the whole operation.
    DatabaseUnavailable,

    // -- Signing --
    /// A manifest signature was requested but could not be produced.
    SigningFailed,

    // -- Internal --
    /// Catch-all for unexpected internal errors.
    Internal,
}

impl ErrorCode {
    /// Returns the broad [`ErrorCategory`] this code belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingField | Self::InvalidPlatform | Self::InvalidJson => {
                ErrorCategory::InputInvalid
            }
            Self::AuthMissing => ErrorCategory::AuthFailed,
            Self::AuthBad => ErrorCategory::AuthFailed,
            Self::AssetPathForbidden => ErrorCategory::Forbidden,
            Self::ApplicationNotFound | Self::UploadNotFound | Self::AssetNotFound => {
                ErrorCategory::NotFound
            }
            Self::AlreadyReleased => ErrorCategory::Conflict,
            Self::PayloadTooLarge => ErrorCategory::PayloadTooLarge,
            Self::ObjectStoreUnavailable | Self::DatabaseUnavailable => {
                ErrorCategory::StoreUnavailable
            }
            Self::SigningFailed => ErrorCategory::SigningFailed,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"ASSET_PATH_FORBIDDEN"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingField => "MISSING_FIELD",
            Self::InvalidPlatform => "INVALID_PLATFORM",
            Self::InvalidJson => "INVALID_JSON",
            Self::AuthMissing => "AUTH_MISSING",
            Self::AuthBad => "AUTH_BAD",
            Self::AssetPathForbidden => "ASSET_PATH_FORBIDDEN",
            Self::ApplicationNotFound => "APPLICATION_NOT_FOUND",
            Self::UploadNotFound => "UPLOAD_NOT_FOUND",
            Self::AssetNotFound => "ASSET_NOT_FOUND",
            Self::AlreadyReleased => "ALREADY_RELEASED",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::ObjectStoreUnavailable => "OBJECT_STORE_UNAVAILABLE",
            Self::DatabaseUnavailable => "DATABASE_UNAVAILABLE",
            Self::SigningFailed => "SIGNING_FAILED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OtaError
// ---------------------------------------------------------------------------

/// Unified error for the OTA updates server.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Examples
///
/// ```
/// use ota_error::{ErrorCode, OtaError};
///
/// let err = OtaError::new(ErrorCode::UploadNotFound, "no upload with that id")
///     .with_context("upload_id", "b3b7e2b0-0000-0000-0000-000000000000");
/// assert_eq!(err.code, ErrorCode::UploadNotFound);
/// ```
pub struct OtaError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl OtaError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Shorthand for `self.code.category().http_status()`.
    pub fn http_status(&self) -> u16 {
        self.category().http_status()
    }
}

impl fmt::Debug for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("OtaError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for OtaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// ---------------------------------------------------------------------------
// Axum integration
// ---------------------------------------------------------------------------

/// Renders an [`OtaError`] as the HTTP response the error-handling design
/// prescribes: the category's status code and a short JSON body carrying
/// the stable code, the message, and any diagnostic context. No cause
/// chain is serialised — `source` is for logs, not API consumers.
impl IntoResponse for OtaError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "context": self.context,
            }
        }));
        (status, body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Convenience constructors for the common not-found / conflict shapes
// ---------------------------------------------------------------------------

impl OtaError {
    /// Shorthand for `ErrorCode::ApplicationNotFound`.
    pub fn application_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ApplicationNotFound, format!("no application '{id}'"))
    }

    /// Shorthand for `ErrorCode::UploadNotFound`.
    pub fn upload_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::UploadNotFound, format!("no upload '{id}'"))
    }

    /// Shorthand for `ErrorCode::AlreadyReleased`.
    pub fn already_released(id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::AlreadyReleased,
            format!("upload '{id}' is already released"),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    const ALL_CODES: &[ErrorCode] = &[
        ErrorCode::MissingField,
        ErrorCode::InvalidPlatform,
        ErrorCode::InvalidJson,
        ErrorCode::AuthMissing,
        ErrorCode::AuthBad,
        ErrorCode::AssetPathForbidden,
        ErrorCode::ApplicationNotFound,
        ErrorCode::UploadNotFound,
        ErrorCode::AssetNotFound,
        ErrorCode::AlreadyReleased,
        ErrorCode::PayloadTooLarge,
        ErrorCode::ObjectStoreUnavailable,
        ErrorCode::DatabaseUnavailable,
        ErrorCode::SigningFailed,
        ErrorCode::Internal,
    ];

    #[test]
    fn basic_construction() {
        let err = OtaError::new(ErrorCode::Internal, "boom");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, "boom");
        assert!(err.source.is_none());
        assert!(err.context.is_empty());
    }

    #[test]
    fn display_without_context() {
        let err = OtaError::new(ErrorCode::UploadNotFound, "no such upload");
        assert_eq!(err.to_string(), "[UPLOAD_NOT_FOUND] no such upload");
    }

    #[test]
    fn display_with_context() {
        let err = OtaError::new(ErrorCode::AssetPathForbidden, "bad key")
            .with_context("key", "secrets/app.json");
        let s = err.to_string();
        assert!(s.starts_with("[ASSET_PATH_FORBIDDEN] bad key"));
        assert!(s.contains("secrets/app.json"));
    }

    #[test]
    fn debug_with_source() {
        let src = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err = OtaError::new(ErrorCode::ObjectStoreUnavailable, "put failed").with_source(src);
        let dbg = format!("{err:?}");
        assert!(dbg.contains("source"));
        assert!(dbg.contains("missing"));
    }

    #[test]
    fn category_to_http_status_matches_taxonomy_table() {
        assert_eq!(ErrorCode::MissingField.category().http_status(), 400);
        assert_eq!(ErrorCode::AuthMissing.category().http_status(), 401);
        assert_eq!(ErrorCode::AssetPathForbidden.category().http_status(), 403);
        assert_eq!(ErrorCode::UploadNotFound.category().http_status(), 404);
        assert_eq!(ErrorCode::AlreadyReleased.category().http_status(), 409);
        assert_eq!(ErrorCode::PayloadTooLarge.category().http_status(), 413);
        assert_eq!(
            ErrorCode::ObjectStoreUnavailable.category().http_status(),
            500
        );
        assert_eq!(ErrorCode::SigningFailed.category().http_status(), 500);
        assert_eq!(ErrorCode::Internal.category().http_status(), 500);
    }

    #[test]
    fn all_codes_have_unique_as_str() {
        let mut seen = std::collections::HashSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.as_str()), "duplicate as_str: {code:?}");
        }
        assert_eq!(seen.len(), ALL_CODES.len());
    }

    #[test]
    fn all_codes_display_matches_as_str() {
        for code in ALL_CODES {
            assert_eq!(code.to_string(), code.as_str());
        }
    }

    #[test]
    fn error_code_serde_roundtrip() {
        let json = serde_json::to_string(&ErrorCode::AlreadyReleased).unwrap();
        assert_eq!(json, r#""ALREADY_RELEASED""#);
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::AlreadyReleased);
    }

    #[test]
    fn convenience_constructors_carry_id_in_message() {
        let err = OtaError::upload_not_found("11111111-1111-1111-1111-111111111111");
        assert_eq!(err.code, ErrorCode::UploadNotFound);
        assert!(err.message.contains("11111111"));
    }

    #[test]
    fn with_context_multiple_keys() {
        let err = OtaError::new(ErrorCode::InvalidJson, "bad body")
            .with_context("field", "metadata.json")
            .with_context("offset", 42);
        assert_eq!(err.context.len(), 2);
        assert_eq!(err.context["field"], serde_json::json!("metadata.json"));
        assert_eq!(err.context["offset"], serde_json::json!(42));
    }

    #[test]
    fn into_response_uses_category_status() {
        let resp = OtaError::upload_not_found("x").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn std_error_source_chain() {
        let inner = io::Error::new(io::ErrorKind::BrokenPipe, "pipe broke");
        let err = OtaError::new(ErrorCode::DatabaseUnavailable, "query failed").with_source(inner);
        let src = std::error::Error::source(&err).unwrap();
        assert_eq!(src.to_string(), "pipe broke");
    }
}
