//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is an input problem detected before the accounting engine is
/// contacted. Engine and transport failures live in the gateway layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. zero amount).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A display name cannot be packed into the engine's auxiliary field.
    #[error("invalid display name: {0}")]
    InvalidName(String),

    /// A query window whose lower bound lies after its upper bound.
    #[error("invalid time range: from {from} is after to {to}")]
    InvalidTimeRange { from: u64, to: u64 },
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::InvalidName(msg.into())
    }
}
