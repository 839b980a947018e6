//! Domain adapters
//!
//! Each adapter wraps a repository, implements or serves its domain's
//! storage needs, and translates rows to domain values.

pub mod billing;
pub mod rates;

pub use billing::{PostgresInvoiceStore, PostgresReconciliationAdapter};
pub use rates::PostgresRateCardAdapter;
