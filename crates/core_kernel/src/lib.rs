//! Core Kernel - Foundational types for the MSP billing core
//!
//! This crate provides the building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic and half-up rounding
//! - Effective-date windows and company timezones
//! - Strongly-typed identifiers
//! - The explicit operation context (company, actor, clock)
//! - The shared error-kind taxonomy

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod context;
pub mod error;

pub use money::{Money, Currency, MoneyError, Rate, round_half_up, MONEY_SCALE};
pub use temporal::{EffectivePeriod, Timezone, TemporalError, full_years_between};
pub use identifiers::{
    CompanyId, UserId, ClientId, ContactId, AssetId,
    InvoiceId, InvoiceItemId, PaymentId, CreditId, ApplicationId,
    BankTransactionId, ExpenseId, RateCardId, TimeEntryId,
    ContractId, DepreciationId,
};
pub use context::{Clock, SystemClock, FixedClock, OperationContext};
pub use error::ErrorKind;
