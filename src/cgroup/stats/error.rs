//! Defines structured error types for parsing cgroup accounting files.
//!
//! - [`StatParseError::InvalidKeyValue`]: a `key value` line whose value is not a counter.
//! - [`StatParseError::InvalidValue`]: a single-value file (e.g. `memory.usage_in_bytes`)
//!   whose value is not a byte count.
//! - [`StatParseError::MissingValue`]: a single-value file without any line.
//! - [`StatParseError::DuplicateField`]: a key seen twice where that is not allowed.
//! - [`StatParseError::Io`]: the underlying read failed, e.g. because the cgroup was
//!   removed while it was being read.

use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatParseError {
    #[error("duplicate field '{field}' at line {line}")]
    DuplicateField { field: String, line: usize },

    #[error("invalid value for '{key}' at line {line}: '{value}': {source}")]
    InvalidKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid value at line {line}: '{value}': {source}")]
    InvalidValue {
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("missing value")]
    MissingValue,

    #[error("error during I/O: {0}")]
    Io(#[from] std::io::Error),
}
