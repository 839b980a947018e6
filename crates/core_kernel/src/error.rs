//! Failure categories shared by every domain error type

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::MoneyError;
use crate::temporal::TemporalError;

/// Category of a failure, shared by every domain error type
///
/// Callers branch on the kind rather than on crate-specific variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input or configuration is invalid
    Validation,
    /// No record applies to the requested scope
    NotFound,
    /// The operation would break a cross-record invariant
    Consistency,
    /// A calculation is undefined (division by zero)
    Arithmetic,
    /// A concurrent writer changed the record first
    Conflict,
    /// The storage backend failed
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Consistency => "consistency",
            ErrorKind::Arithmetic => "arithmetic",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

impl MoneyError {
    /// Returns the failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            MoneyError::DivisionByZero => ErrorKind::Arithmetic,
            MoneyError::CurrencyMismatch(..)
            | MoneyError::InvalidAmount(_)
            | MoneyError::UnknownCurrency(_) => ErrorKind::Validation,
        }
    }
}

impl TemporalError {
    /// Returns the failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            TemporalError::InvalidPeriod { .. } | TemporalError::UnknownTimezone(_) => ErrorKind::Validation,
        }
    }
}
