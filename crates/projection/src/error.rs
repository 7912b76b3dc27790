//! Projection failures and their bad-input / internal classification.

use launch_core::{GatewayError, ValidationError};
use launch_econ::EconError;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadInput,
    Internal,
}

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// The request document could not be decoded.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    /// Enabled retailers the historical store does not know.
    #[error("unknown retailers: {}", .0.join(", "))]
    UnknownRetailers(Vec<String>),
    #[error(transparent)]
    Store(#[from] GatewayError),
    #[error(transparent)]
    Finance(#[from] EconError),
    /// A write fell outside the sheet produced by the layout builder.
    #[error("grid cell ({row}, {col}) is outside the layout")]
    Layout { row: usize, col: usize },
    #[error("projection did not finish within {0:?}")]
    Timeout(Duration),
}

impl ProjectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProjectionError::Invalid(_)
            | ProjectionError::MalformedRequest(_)
            | ProjectionError::UnknownRetailers(_) => ErrorKind::BadInput,
            ProjectionError::Store(_)
            | ProjectionError::Finance(_)
            | ProjectionError::Layout { .. }
            | ProjectionError::Timeout(_) => ErrorKind::Internal,
        }
    }

    /// Serializable `{kind, message}` pair.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}
