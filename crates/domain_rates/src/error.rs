//! Rates domain errors

use chrono::NaiveDate;
use thiserror::Error;

use core_kernel::{ClientId, ErrorKind, MoneyError, RateCardId, TemporalError};

/// Errors that can occur in the rates domain
#[derive(Debug, Error)]
pub enum RateError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// No active rate card covers the client, service, and date
    #[error("No applicable rate card for client {client_id}, service {service_type:?} on {date}")]
    NoApplicableRateCard {
        client_id: ClientId,
        service_type: Option<String>,
        date: NaiveDate,
    },

    #[error("Rate card not found: {0}")]
    RateCardNotFound(RateCardId),

    #[error("Temporal error: {0}")]
    Temporal(#[from] TemporalError),

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),

    /// Storage backend failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl RateError {
    pub fn validation(message: impl Into<String>) -> Self {
        RateError::Validation(message.into())
    }

    /// Returns the failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            RateError::Validation(_) => ErrorKind::Validation,
            RateError::Temporal(e) => e.kind(),
            RateError::NoApplicableRateCard { .. } | RateError::RateCardNotFound(_) => {
                ErrorKind::NotFound
            }
            RateError::Money(e) => e.kind(),
            RateError::Storage(_) => ErrorKind::Storage,
        }
    }
}
