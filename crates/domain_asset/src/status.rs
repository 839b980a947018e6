//! Point-in-time depreciation status

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{full_years_between, Money};

use crate::error::DepreciationError;
use crate::record::AssetDepreciation;
use crate::schedule::depreciation_schedule;

/// Derived figures of a record on a given date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepreciationStatus {
    pub as_of: NaiveDate,
    /// Full years of life elapsed, capped at the useful life
    pub years_elapsed: u32,
    /// Charge for the year in progress; zero once fully depreciated
    pub annual_depreciation: Money,
    pub accumulated_depreciation: Money,
    pub current_book_value: Money,
}

impl DepreciationStatus {
    pub fn is_fully_depreciated(&self, record: &AssetDepreciation) -> bool {
        self.years_elapsed >= record.useful_life_years
    }
}

/// Reads the status of a record on `as_of` from its schedule
///
/// Only completed years count towards accumulated depreciation; a date
/// before the start date reports the original cost as book value.
pub fn status_as_of(record: &AssetDepreciation, as_of: NaiveDate) -> Result<DepreciationStatus, DepreciationError> {
    let schedule = depreciation_schedule(record)?;
    let currency = record.original_cost.currency();
    let years_elapsed = full_years_between(record.start_date, as_of).min(record.useful_life_years);

    let (accumulated, book_value) = match years_elapsed.checked_sub(1).and_then(|i| schedule.get(i as usize)) {
        Some(entry) => (entry.accumulated_depreciation, entry.book_value),
        None => (Money::zero(currency), record.original_cost),
    };
    let annual = schedule
        .get(years_elapsed as usize)
        .map(|entry| entry.annual_depreciation)
        .unwrap_or_else(|| Money::zero(currency));

    Ok(DepreciationStatus {
        as_of,
        years_elapsed,
        annual_depreciation: annual,
        accumulated_depreciation: accumulated,
        current_book_value: book_value,
    })
}
