//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! MSP billing core test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common entities
//! - `builders`: Builder patterns for invoices, rate cards, time entries,
//!   contracts, and bank transactions
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators
//! - `database`: PostgreSQL test containers
//!
//! Cross-crate workflow tests live in this crate's `tests/` directory.

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;
pub mod database;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
