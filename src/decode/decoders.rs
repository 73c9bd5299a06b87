//! Decoder implementations

use super::types::ItemDecoder;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

// ============================================================================
// Identity Decoder
// ============================================================================

/// Passes raw items through unmodified
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDecoder;

impl ItemDecoder for IdentityDecoder {
    type Item = Value;

    fn decode(&self, raw: Value) -> Result<Value> {
        Ok(raw)
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

// ============================================================================
// Function Decoder
// ============================================================================

/// Delegates decoding to an external function
pub struct FnDecoder<F, T> {
    decode_fn: F,
    _item: PhantomData<fn() -> T>,
}

impl<F, T> FnDecoder<F, T>
where
    F: Fn(Value) -> anyhow::Result<T> + Send + Sync,
    T: Send,
{
    /// Wrap a decoding function
    pub fn new(decode_fn: F) -> Self {
        Self {
            decode_fn,
            _item: PhantomData,
        }
    }
}

impl<F, T> ItemDecoder for FnDecoder<F, T>
where
    F: Fn(Value) -> anyhow::Result<T> + Send + Sync,
    T: Send,
{
    type Item = T;

    fn decode(&self, raw: Value) -> Result<T> {
        (self.decode_fn)(raw).map_err(Error::from)
    }

    fn name(&self) -> &'static str {
        "external"
    }
}

impl<F, T> fmt::Debug for FnDecoder<F, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDecoder").finish_non_exhaustive()
    }
}

// ============================================================================
// Typed Decoder
// ============================================================================

/// Deserializes each item into `T`
pub struct TypedDecoder<T> {
    _item: PhantomData<fn() -> T>,
}

impl<T> TypedDecoder<T> {
    /// Create a typed decoder
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T> Default for TypedDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ItemDecoder for TypedDecoder<T>
where
    T: DeserializeOwned + Send,
{
    type Item = T;

    fn decode(&self, raw: Value) -> Result<T> {
        serde_json::from_value(raw).map_err(|e| Error::decode(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "typed"
    }
}

impl<T> fmt::Debug for TypedDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TypedDecoder")
    }
}
