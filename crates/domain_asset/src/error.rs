//! Asset domain errors

use thiserror::Error;

use core_kernel::{ErrorKind, MoneyError};

use crate::method::DepreciationMethod;

/// Errors that can occur in the asset domain
#[derive(Debug, Error)]
pub enum DepreciationError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{method} depreciation requires a depreciation rate")]
    MissingRate { method: DepreciationMethod },

    #[error("Useful life must be at least one year")]
    ZeroUsefulLife,

    #[error("Total expected units must be greater than zero")]
    ZeroExpectedUnits,

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl DepreciationError {
    pub fn validation(message: impl Into<String>) -> Self {
        DepreciationError::Validation(message.into())
    }

    /// Returns the failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            DepreciationError::Validation(_) | DepreciationError::MissingRate { .. } => {
                ErrorKind::Validation
            }
            DepreciationError::ZeroUsefulLife | DepreciationError::ZeroExpectedUnits => {
                ErrorKind::Arithmetic
            }
            DepreciationError::Money(e) => e.kind(),
        }
    }
}
