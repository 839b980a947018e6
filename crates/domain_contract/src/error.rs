//! Contract domain errors

use chrono::NaiveDate;
use thiserror::Error;

use core_kernel::{ContractId, ErrorKind, MoneyError};

use crate::config::BillingModel;
use crate::contract::ContractStatus;

/// Errors that can occur in the contract domain
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Populated billing fields do not fit the billing model
    #[error("Invalid {model} configuration: {reason}")]
    InvalidConfiguration { model: BillingModel, reason: String },

    #[error("Date {date} is outside the term of contract {contract_id}")]
    OutsideTerm { contract_id: ContractId, date: NaiveDate },

    #[error("Contract {contract_id} is {status} and cannot be billed")]
    NotBillable {
        contract_id: ContractId,
        status: ContractStatus,
    },

    #[error("Contact access tier not found: {0}")]
    TierNotFound(String),

    #[error("Cannot {action} a contract in status {from}")]
    InvalidTransition {
        from: ContractStatus,
        action: &'static str,
    },

    #[error("Record belongs to a different company: {0}")]
    CompanyMismatch(String),

    /// The assignment collaborator failed
    #[error("Assignment failed: {0}")]
    Assignment(String),

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl ContractError {
    pub fn validation(message: impl Into<String>) -> Self {
        ContractError::Validation(message.into())
    }

    pub fn invalid_config(model: BillingModel, reason: impl Into<String>) -> Self {
        ContractError::InvalidConfiguration {
            model,
            reason: reason.into(),
        }
    }

    /// Returns the failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::Validation(_)
            | ContractError::InvalidConfiguration { .. }
            | ContractError::OutsideTerm { .. }
            | ContractError::NotBillable { .. } => ErrorKind::Validation,
            ContractError::TierNotFound(_) => ErrorKind::NotFound,
            ContractError::InvalidTransition { .. } | ContractError::CompanyMismatch(_) => {
                ErrorKind::Consistency
            }
            ContractError::Assignment(_) => ErrorKind::Storage,
            ContractError::Money(e) => e.kind(),
        }
    }
}
