//! Common types used throughout searchtweets
//!
//! This module contains shared type definitions and type aliases
//! used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

// ============================================================================
// Endpoint Kind
// ============================================================================

/// Which API resource a request payload targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    /// Individual search results
    #[default]
    Search,
    /// Aggregate counts per time bucket
    Counts,
}

impl EndpointKind {
    /// Lowercase name used in logs
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointKind::Search => "search",
            EndpointKind::Counts => "counts",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
