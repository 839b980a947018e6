//! Billing domain errors

use thiserror::Error;

use core_kernel::{ApplicationId, BankTransactionId, ErrorKind, InvoiceId, MoneyError};

use crate::invoice::InvoiceStatus;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invoice not found
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// Application not found on the invoice
    #[error("Application {application_id} not found on invoice {invoice_id}")]
    ApplicationNotFound {
        invoice_id: InvoiceId,
        application_id: ApplicationId,
    },

    /// Explicit lifecycle action not allowed from the current status
    #[error("Cannot {action} an invoice in status {from}")]
    InvalidTransition {
        from: InvoiceStatus,
        action: &'static str,
    },

    /// Target invoice is cancelled
    #[error("Invoice {0} is cancelled")]
    CancelledInvoice(InvoiceId),

    /// Bank transaction already linked to a different target
    #[error("Bank transaction {0} is already reconciled to another target")]
    AlreadyReconciled(BankTransactionId),

    /// Record belongs to a different company than the operation context
    #[error("Record belongs to a different company: {0}")]
    CompanyMismatch(String),

    /// Optimistic version check failed
    #[error("Invoice {invoice_id} was modified concurrently: expected version {expected}, found {actual}")]
    VersionConflict {
        invoice_id: InvoiceId,
        expected: u64,
        actual: u64,
    },

    /// Storage backend failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Money arithmetic failed
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl BillingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BillingError::Validation(message.into())
    }

    /// Returns the failure category
    pub fn kind(&self) -> ErrorKind {
        match self {
            BillingError::Validation(_) => ErrorKind::Validation,
            BillingError::InvoiceNotFound(_) | BillingError::ApplicationNotFound { .. } => {
                ErrorKind::NotFound
            }
            BillingError::InvalidTransition { .. }
            | BillingError::CancelledInvoice(_)
            | BillingError::AlreadyReconciled(_)
            | BillingError::CompanyMismatch(_) => ErrorKind::Consistency,
            BillingError::VersionConflict { .. } => ErrorKind::Conflict,
            BillingError::Storage(_) => ErrorKind::Storage,
            BillingError::Money(e) => e.kind(),
        }
    }
}
