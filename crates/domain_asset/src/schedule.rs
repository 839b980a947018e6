//! Depreciation schedules
//!
//! A schedule has one entry per year of useful life and is recomputed from
//! the record on every call. Each annual charge is rounded half away from
//! zero to the currency scale and then clamped so accumulated depreciation
//! never exceeds the depreciable base.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{round_half_up, Money};

use crate::error::DepreciationError;
use crate::method::DepreciationMethod;
use crate::record::AssetDepreciation;

/// One year of a depreciation schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// One-based year of useful life
    pub year: u32,
    pub annual_depreciation: Money,
    pub accumulated_depreciation: Money,
    /// Book value at the end of the year
    pub book_value: Money,
}

/// Builds the year-by-year schedule for a record
pub fn depreciation_schedule(record: &AssetDepreciation) -> Result<Vec<ScheduleEntry>, DepreciationError> {
    record.validate()?;

    let currency = record.original_cost.currency();
    let dp = currency.decimal_places();
    let cost = record.original_cost.amount();
    let base = record.depreciable_base()?.amount();
    let life = record.useful_life_years;

    let mut entries = Vec::with_capacity(life as usize);
    let mut accumulated = Decimal::ZERO;

    for year in 1..=life {
        let remaining = base - accumulated;
        let raw = if year == life && record.method.trues_up_final_year() {
            remaining
        } else {
            round_half_up(raw_annual(record, year, base, cost - accumulated)?, dp)
        };
        let annual = raw.clamp(Decimal::ZERO, remaining);
        accumulated += annual;

        entries.push(ScheduleEntry {
            year,
            annual_depreciation: Money::new(annual, currency),
            accumulated_depreciation: Money::new(accumulated, currency),
            book_value: Money::new(cost - accumulated, currency),
        });
    }

    debug!(
        asset_id = %record.asset_id,
        method = %record.method,
        years = life,
        accumulated = %accumulated,
        "Depreciation schedule computed"
    );
    Ok(entries)
}

/// Unrounded, unclamped charge for `year` given the opening book value
fn raw_annual(
    record: &AssetDepreciation,
    year: u32,
    base: Decimal,
    opening_book: Decimal,
) -> Result<Decimal, DepreciationError> {
    let life = Decimal::from(record.useful_life_years);

    let annual = match record.method {
        DepreciationMethod::StraightLine => base / life,
        DepreciationMethod::DecliningBalance | DepreciationMethod::DoubleDeclining => {
            opening_book * record.effective_rate()?
        }
        DepreciationMethod::SumOfYears => {
            let digits = life * (life + Decimal::ONE) / Decimal::TWO;
            let remaining_life = life - Decimal::from(year) + Decimal::ONE;
            base * remaining_life / digits
        }
        DepreciationMethod::UnitsOfProduction => {
            let total = record
                .total_expected_units
                .filter(|t| !t.is_zero())
                .ok_or(DepreciationError::ZeroExpectedUnits)?;
            base * record.units_in_year(year) / total
        }
    };
    Ok(annual)
}
