//! Billing Domain - Invoice Ledger and Reconciliation
//!
//! This crate owns the authoritative paid/outstanding amounts of invoices
//! and their status transitions.
//!
//! # Ledger Principles
//!
//! - An invoice balance is always derived: `amount - total_paid`
//! - Payments and credits reach an invoice only through applications
//! - Applications are soft-voided, never deleted
//! - Status follows the balance, except Draft and Cancelled which only move
//!   through explicit `send` and `void`
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{ledger, Application, LedgerService, InMemoryInvoiceStore};
//!
//! let service = LedgerService::new(Arc::new(InMemoryInvoiceStore::new()));
//! let app = Application::payment(payment_id, invoice.id, amount, &ctx);
//! let posted = service.post_application(invoice.id, app, &ctx).await?;
//!
//! assert_eq!(ledger::balance(&posted.invoice), expected);
//! ```

pub mod application;
pub mod error;
pub mod expense;
pub mod filter;
pub mod invoice;
pub mod ledger;
pub mod reconciliation;
pub mod service;
pub mod store;

pub use application::{Application, ApplicationSource, ApplicationTarget, Exclusion, SourceState};
pub use error::BillingError;
pub use expense::Expense;
pub use filter::InvoiceFilter;
pub use invoice::{Invoice, InvoiceItem, InvoiceItemType, InvoiceStatus};
pub use ledger::{PaymentSummary, StatusChange};
pub use reconciliation::{
    BankTransaction, BatchFailure, BatchReport, MatchCriteria, MatchSuggestion, ReconcileOutcome,
    Reconciliation, ReconciliationTarget, TargetSnapshot,
};
pub use service::{LedgerService, PostingResult, SweepFailure, SweepReport};
pub use store::{InMemoryInvoiceStore, InvoiceStore};
