//! Repository implementations
//!
//! Repositories own the SQL and speak in row types; the adapters in
//! [`crate::adapters`] translate rows to and from domain values.

pub mod bank_transactions;
pub mod invoices;
pub mod rate_cards;

pub use bank_transactions::BankTransactionRepository;
pub use invoices::InvoiceRepository;
pub use rate_cards::RateCardRepository;
