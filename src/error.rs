//! Crate error type.
//!
//! Generation and budget sizing never fail: infeasibility is reported through
//! warnings and row annotations. Errors only surface from strict configuration
//! validation and from rule-pack documents that are not valid JSON.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unrecognized rule pack document: {0}")]
    UnrecognizedPack(String),

    #[cfg(feature = "serde")]
    #[error("rule pack json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
