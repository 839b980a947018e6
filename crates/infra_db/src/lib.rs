//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the billing core using SQLx.
//!
//! # Architecture
//!
//! - `repositories` own the SQL and exchange `FromRow` row structs
//! - `adapters` implement domain ports (`InvoiceStore`) and translate rows
//!   into domain values
//!
//! Invoice writes are guarded by an optimistic version column:
//! `UPDATE invoices ... WHERE id = $1 AND version = $2`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresInvoiceStore};
//!
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! let service = LedgerService::new(Arc::new(PostgresInvoiceStore::new(pool)));
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PostgresInvoiceStore, PostgresRateCardAdapter, PostgresReconciliationAdapter};
pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
