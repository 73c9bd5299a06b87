//! Decoder traits

use crate::error::Result;
use serde_json::Value;

/// Trait for turning a raw result item into a decoded item
pub trait ItemDecoder: Send + Sync {
    /// Decoded item type
    type Item: Send;

    /// Decode one raw item
    fn decode(&self, raw: Value) -> Result<Self::Item>;

    /// Short name used in diagnostics
    fn name(&self) -> &'static str {
        "custom"
    }
}
