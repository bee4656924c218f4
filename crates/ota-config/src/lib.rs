// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for the OTA updates server.
//!
//! This crate provides [`ServerConfig`] — the top-level runtime settings —
//! together with helpers for loading from TOML files, applying environment
//! overrides, and producing advisory [`ConfigWarning`]s. Config is read once
//! at process start; there is no hot-reload path.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent startup but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A recommended optional field is missing.
    MissingOptionalField {
        /// Name of the missing field.
        field: String,
        /// Why it matters.
        hint: String,
    },
    /// The configured upload body limit is unusually large.
    LargeUploadLimit {
        /// Configured limit, in bytes.
        bytes: u64,
    },
    /// The local filesystem store is selected, which is unsuitable for
    /// anything but a single-node deployment.
    LocalStoreInProduction,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::MissingOptionalField { field, hint } => {
                write!(f, "missing optional field '{field}': {hint}")
            }
            ConfigWarning::LargeUploadLimit { bytes } => {
                write!(f, "max_upload_bytes is unusually large ({bytes} bytes)")
            }
            ConfigWarning::LocalStoreInProduction => {
                write!(f, "using the local filesystem object store")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level runtime configuration for the OTA updates server.
///
/// The five process-wide inputs (`bearer_secret`, `upload_secret`,
/// `base_url`, `admin_password`, `database_url`) have no defaults: an empty
/// value is a hard validation error, since the server cannot run without
/// them. Every other field has a sensible default.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Secret used to sign and verify dashboard bearer tokens.
    #[serde(default)]
    pub bearer_secret: String,

    /// Shared secret publishers must present on `POST /upload`.
    #[serde(default)]
    pub upload_secret: String,

    /// Externally visible base URL, used to build absolute asset URLs.
    #[serde(default)]
    pub base_url: String,

    /// Bootstrap password for the first admin dashboard account.
    #[serde(default)]
    pub admin_password: String,

    /// Postgres connection string.
    #[serde(default)]
    pub database_url: String,

    /// Object-store backend selection and connection details.
    #[serde(default)]
    pub store: StoreConfig,

    /// Maximum accepted size, in bytes, of a single upload request body.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_level: Some("info".into()),
            bearer_secret: String::new(),
            upload_secret: String::new(),
            base_url: String::new(),
            admin_password: String::new(),
            database_url: String::new(),
            store: StoreConfig::default(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_upload_bytes() -> u64 {
    500 * 1024 * 1024
}

/// Object-store backend selection (§4.2).
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Local filesystem root, for single-node self-hosted deployments.
    Local {
        /// Directory every key is resolved relative to.
        path: String,
    },
    /// An S3-compatible bucket.
    S3 {
        /// Bucket name.
        bucket: String,
        /// AWS (or compatible) region.
        region: String,
        /// Override endpoint, for S3-compatible services other than AWS.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Local {
            path: "./data/blobs".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Threshold above which `max_upload_bytes` generates a warning (2 GiB).
const LARGE_UPLOAD_THRESHOLD: u64 = 2 * 1024 * 1024 * 1024;

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`ServerConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, starts from [`ServerConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => ServerConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`ServerConfig`].
pub fn parse_toml(content: &str) -> Result<ServerConfig, ConfigError> {
    toml::from_str::<ServerConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `OTA_BIND_ADDR`
/// - `OTA_LOG_LEVEL`
/// - `OTA_BEARER_SECRET`
/// - `OTA_UPLOAD_SECRET`
/// - `OTA_BASE_URL`
/// - `OTA_ADMIN_PASSWORD`
/// - `OTA_DATABASE_URL`
/// - `OTA_MAX_UPLOAD_BYTES`
/// - `OTA_STORE_LOCAL_PATH` (selects the local store)
/// - `OTA_STORE_S3_BUCKET`, `OTA_STORE_S3_REGION`, `OTA_STORE_S3_ENDPOINT`
///   (selects the S3 store; bucket and region are required together)
pub fn apply_env_overrides(config: &mut ServerConfig) {
    if let Ok(val) = std::env::var("OTA_BIND_ADDR") {
        config.bind_addr = val;
    }
    if let Ok(val) = std::env::var("OTA_LOG_LEVEL") {
        config.log_level = Some(val);
    }
    if let Ok(val) = std::env::var("OTA_BEARER_SECRET") {
        config.bearer_secret = val;
    }
    if let Ok(val) = std::env::var("OTA_UPLOAD_SECRET") {
        config.upload_secret = val;
    }
    if let Ok(val) = std::env::var("OTA_BASE_URL") {
        config.base_url = val;
    }
    if let Ok(val) = std::env::var("OTA_ADMIN_PASSWORD") {
        config.admin_password = val;
    }
    if let Ok(val) = std::env::var("OTA_DATABASE_URL") {
        config.database_url = val;
    }
    if let Ok(val) = std::env::var("OTA_MAX_UPLOAD_BYTES")
        && let Ok(n) = val.parse::<u64>()
    {
        config.max_upload_bytes = n;
    }
    if let (Ok(bucket), Ok(region)) = (
        std::env::var("OTA_STORE_S3_BUCKET"),
        std::env::var("OTA_STORE_S3_REGION"),
    ) {
        config.store = StoreConfig::S3 {
            bucket,
            region,
            endpoint: std::env::var("OTA_STORE_S3_ENDPOINT").ok(),
        };
    } else if let Ok(path) = std::env::var("OTA_STORE_LOCAL_PATH") {
        config.store = StoreConfig::Local { path };
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (a missing mandatory secret, an invalid log level, an empty
/// store path/bucket) are returned as a [`ConfigError::ValidationError`];
/// soft issues come back as warnings.
pub fn validate_config(config: &ServerConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    for (field, value) in [
        ("bearer_secret", &config.bearer_secret),
        ("upload_secret", &config.upload_secret),
        ("base_url", &config.base_url),
        ("admin_password", &config.admin_password),
        ("database_url", &config.database_url),
    ] {
        if value.trim().is_empty() {
            errors.push(format!("{field} must be set"));
        }
    }

    if let Some(ref level) = config.log_level
        && !VALID_LOG_LEVELS.contains(&level.as_str())
    {
        errors.push(format!("invalid log_level '{level}'"));
    }

    if config.max_upload_bytes == 0 {
        errors.push("max_upload_bytes must be greater than zero".into());
    } else if config.max_upload_bytes > LARGE_UPLOAD_THRESHOLD {
        warnings.push(ConfigWarning::LargeUploadLimit {
            bytes: config.max_upload_bytes,
        });
    }

    match &config.store {
        StoreConfig::Local { path } => {
            if path.trim().is_empty() {
                errors.push("store.path must not be empty".into());
            }
            warnings.push(ConfigWarning::LocalStoreInProduction);
        }
        StoreConfig::S3 { bucket, region, .. } => {
            if bucket.trim().is_empty() {
                errors.push("store.bucket must not be empty".into());
            }
            if region.trim().is_empty() {
                errors.push("store.region must not be empty".into());
            }
        }
    }

    if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
        warnings.push(ConfigWarning::MissingOptionalField {
            field: "base_url".into(),
            hint: "expected an absolute http(s) URL".into(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_has_sensible_defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.log_level.as_deref(), Some("info"));
        assert_eq!(cfg.max_upload_bytes, 500 * 1024 * 1024);
        assert!(matches!(cfg.store, StoreConfig::Local { .. }));
    }

    #[test]
    fn default_config_fails_validation_on_missing_secrets() {
        let cfg = ServerConfig::default();
        let err = validate_config(&cfg).unwrap_err();
        match err {
            ConfigError::ValidationError { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("bearer_secret")));
                assert!(reasons.iter().any(|r| r.contains("upload_secret")));
                assert!(reasons.iter().any(|r| r.contains("database_url")));
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    fn complete_config() -> ServerConfig {
        ServerConfig {
            bearer_secret: "bearer".into(),
            upload_secret: "upload".into(),
            base_url: "https://updates.example.com".into(),
            admin_password: "hunter2".into(),
            database_url: "postgres://localhost/ota".into(),
            ..Default::default()
        }
    }

    #[test]
    fn fully_populated_config_passes_validation() {
        let cfg = complete_config();
        validate_config(&cfg).expect("should pass");
    }

    #[test]
    fn local_store_produces_advisory_warning() {
        let cfg = complete_config();
        let warnings = validate_config(&cfg).unwrap();
        assert!(
            warnings
                .iter()
                .any(|w| matches!(w, ConfigWarning::LocalStoreInProduction))
        );
    }

    #[test]
    fn validation_catches_invalid_log_level() {
        let cfg = ServerConfig {
            log_level: Some("verbose".into()),
            ..complete_config()
        };
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn validation_catches_zero_upload_limit() {
        let cfg = ServerConfig {
            max_upload_bytes: 0,
            ..complete_config()
        };
        let err = validate_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn large_upload_limit_produces_warning() {
        let cfg = ServerConfig {
            max_upload_bytes: LARGE_UPLOAD_THRESHOLD + 1,
            ..complete_config()
        };
        let warnings = validate_config(&cfg).unwrap();
        assert!(
            warnings
                .iter()
                .any(|w| matches!(w, ConfigWarning::LargeUploadLimit { .. }))
        );
    }

    #[test]
    fn validation_catches_empty_s3_bucket() {
        let cfg = ServerConfig {
            store: StoreConfig::S3 {
                bucket: "".into(),
                region: "us-east-1".into(),
                endpoint: None,
            },
            ..complete_config()
        };
        let err = validate_config(&cfg).unwrap_err();
        match err {
            ConfigError::ValidationError { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("store.bucket")));
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn base_url_without_scheme_produces_advisory_warning() {
        let cfg = ServerConfig {
            base_url: "updates.example.com".into(),
            ..complete_config()
        };
        let warnings = validate_config(&cfg).unwrap();
        assert!(
            warnings
                .iter()
                .any(|w| matches!(w, ConfigWarning::MissingOptionalField { field, .. } if field == "base_url"))
        );
    }

    #[test]
    fn parse_invalid_toml_gives_parse_error() {
        let bad = "this is [not valid toml =";
        let err = parse_toml(bad).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn parse_valid_toml_string() {
        let toml_str = r#"
            bearer_secret = "b"
            upload_secret = "u"
            base_url = "https://example.com"
            admin_password = "pw"
            database_url = "postgres://localhost/ota"

            [store]
            kind = "s3"
            bucket = "my-bucket"
            region = "us-east-1"
        "#;
        let cfg = parse_toml(toml_str).unwrap();
        assert_eq!(cfg.bearer_secret, "b");
        match cfg.store {
            StoreConfig::S3 { bucket, region, .. } => {
                assert_eq!(bucket, "my-bucket");
                assert_eq!(region, "us-east-1");
            }
            other => panic!("expected S3, got {other:?}"),
        }
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ota.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"bearer_secret = "b"
upload_secret = "u"
base_url = "https://example.com"
admin_password = "pw"
database_url = "postgres://localhost/ota""#
        )
        .unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.bearer_secret, "b");
        assert_eq!(cfg.base_url, "https://example.com");
    }

    #[test]
    fn load_missing_file_gives_file_not_found() {
        let err = load_config(Some(Path::new("/nonexistent/ota.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn load_none_returns_default() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    #[allow(unsafe_code)]
    fn env_overrides_take_precedence() {
        // SAFETY: tests run single-threaded per process in this crate's
        // test binary is not guaranteed, so scope the var narrowly and
        // restore it; acceptable because this crate has no other test
        // that reads OTA_BEARER_SECRET concurrently.
        unsafe {
            std::env::set_var("OTA_BEARER_SECRET", "from-env");
        }
        let mut cfg = ServerConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.bearer_secret, "from-env");
        unsafe {
            std::env::remove_var("OTA_BEARER_SECRET");
        }
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = complete_config();
        let serialized = toml::to_string(&cfg).unwrap();
        let deserialized: ServerConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(cfg, deserialized);
    }

    #[test]
    fn config_error_display() {
        let e = ConfigError::FileNotFound {
            path: "/foo".into(),
        };
        assert!(e.to_string().contains("/foo"));
    }
}
