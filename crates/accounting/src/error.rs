//! Gateway error model.

use thiserror::Error;

use ledgergate_core::{DomainError, EngineKey, TransferId};

use crate::engine::{EngineError, EngineResultCode};

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Caller-facing classification of a [`GatewayError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any engine call.
    InvalidArgument,
    /// Engine rejection, transport failure or inconsistent engine data.
    Internal,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A batch create came back with a non-ok result for our item.
    #[error("{operation} rejected by engine: code={code} ({name})")]
    EngineRejection {
        operation: &'static str,
        code: u32,
        name: &'static str,
    },

    #[error("{operation} failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: EngineError,
    },

    /// No engine answer to a query within the configured timeout.
    #[error("{operation} timed out after {after_ms}ms")]
    TimedOut {
        operation: &'static str,
        after_ms: u64,
    },

    /// No engine answer to a write within the configured timeout. The engine
    /// may still commit it.
    #[error("{operation} timed out after {after_ms}ms; outcome unknown")]
    OutcomeUnknown {
        operation: &'static str,
        after_ms: u64,
    },

    /// A transfer references an account the engine could not return.
    #[error("transfer {transfer_id}: counterparty account {account} could not be resolved")]
    UnresolvedCounterparty {
        transfer_id: TransferId,
        account: EngineKey,
    },
}

impl GatewayError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn rejection(operation: &'static str, result: impl EngineResultCode) -> Self {
        Self::EngineRejection {
            operation,
            code: result.code(),
            name: result.name(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            GatewayError::EngineRejection { .. }
            | GatewayError::Transport { .. }
            | GatewayError::TimedOut { .. }
            | GatewayError::OutcomeUnknown { .. }
            | GatewayError::UnresolvedCounterparty { .. } => ErrorKind::Internal,
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }
}

impl From<DomainError> for GatewayError {
    fn from(value: DomainError) -> Self {
        Self::InvalidArgument(value.to_string())
    }
}
