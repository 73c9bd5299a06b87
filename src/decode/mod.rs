//! Item decoder module
//!
//! Turns each raw result item into the value handed to the caller.
//!
//! # Overview
//!
//! - `IdentityDecoder` - passes raw JSON through unmodified
//! - `FnDecoder` - delegates to an external decoding function
//! - `TypedDecoder` - deserializes into a caller-defined type

mod decoders;
mod types;

pub use decoders::{FnDecoder, IdentityDecoder, TypedDecoder};
pub use types::ItemDecoder;
