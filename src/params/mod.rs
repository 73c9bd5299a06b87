//! Request parameter module
//!
//! Builds the normalized payload sent with every search request.
//!
//! # Overview
//!
//! - `RequestPayload` - the typed set of recognized request fields
//! - `gen_request_parameters` - builds a payload from loosely-typed input
//! - `convert_utc_time` - normalizes the accepted timestamp shapes

mod payload;
mod time;

pub use payload::{coerce_int, gen_request_parameters, RequestOptions, RequestPayload};
pub use time::{convert_utc_time, CANONICAL_TIME_FORMAT};
