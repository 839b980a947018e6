//! Rates Domain - Time-Billing Calculator
//!
//! Selects the rate card that applies to a client, service type, and date,
//! and converts worked hours into billable hours and amounts.
//!
//! # Example
//!
//! ```rust,ignore
//! let card = book.select(&RateCardCriteria::new(client_id, Some("helpdesk".into()), today))?;
//! let amount = card.calculate_amount(dec!(1.3))?;
//! ```

pub mod book;
pub mod error;
pub mod rate_card;
pub mod selection;
pub mod time_entry;

pub use book::RateCardBook;
pub use error::RateError;
pub use rate_card::{RateCard, RoundingMethod};
pub use selection::{select_rate_card, RateCardCriteria};
pub use time_entry::{bill_time_entries, bill_time_entry, BilledTime, TimeBillingRun, TimeEntry, UnbilledTime};
