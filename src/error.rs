//! Error types for searchtweets
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use serde_json::Value;
use thiserror::Error;

/// The main error type for searchtweets
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ============================================================================
    // Request Building Errors
    // ============================================================================
    #[error("Invalid timestamp '{input}': {message}")]
    Format { input: String, message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no error message"))]
    Protocol {
        status: u16,
        message: Option<String>,
        payload: Value,
    },

    #[error("Rate limited (HTTP {status})")]
    RateLimited { status: u16 },

    // ============================================================================
    // Response Errors
    // ============================================================================
    #[error("Failed to parse response body: {message}")]
    Parse { message: String },

    #[error("Failed to decode item: {message}")]
    Decode { message: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a timestamp format error
    pub fn format(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a protocol error for a request that exhausted its retries
    pub fn protocol(status: u16, message: Option<String>, payload: Value) -> Self {
        Self::Protocol {
            status,
            message,
            payload,
        }
    }

    /// Create a response parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Protocol { status, .. } | Error::RateLimited { status } => Some(*status),
            Error::Connection(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for searchtweets
pub type Result<T> = std::result::Result<T, Error>;
