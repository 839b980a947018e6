//! Asset depreciation records

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AssetId, DepreciationId, Money, Rate};

use crate::error::DepreciationError;
use crate::method::DepreciationMethod;

/// Longest useful life a record may declare
pub const MAX_USEFUL_LIFE_YEARS: u32 = 100;

/// Depreciation terms of a single asset
///
/// Derived figures (annual charge, accumulated depreciation, book value)
/// are never stored here; they are recomputed from the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDepreciation {
    pub id: DepreciationId,
    pub asset_id: AssetId,
    pub original_cost: Money,
    pub salvage_value: Money,
    pub useful_life_years: u32,
    pub method: DepreciationMethod,
    /// Required for declining balance; overrides `2 / life` for double declining
    pub depreciation_rate: Option<Rate>,
    pub start_date: NaiveDate,
    /// Units-of-production only
    pub total_expected_units: Option<Decimal>,
    /// Units used in each year of life, year one first; missing years used none
    #[serde(default)]
    pub units_per_year: Vec<Decimal>,
}

impl AssetDepreciation {
    pub fn new(
        asset_id: AssetId,
        original_cost: Money,
        salvage_value: Money,
        useful_life_years: u32,
        method: DepreciationMethod,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: DepreciationId::new_v7(),
            asset_id,
            original_cost,
            salvage_value,
            useful_life_years,
            method,
            depreciation_rate: None,
            start_date,
            total_expected_units: None,
            units_per_year: Vec::new(),
        }
    }

    pub fn with_rate(mut self, rate: Rate) -> Self {
        self.depreciation_rate = Some(rate);
        self
    }

    pub fn with_units(mut self, total_expected: Decimal, per_year: Vec<Decimal>) -> Self {
        self.total_expected_units = Some(total_expected);
        self.units_per_year = per_year;
        self
    }

    /// Cost minus salvage
    pub fn depreciable_base(&self) -> Result<Money, DepreciationError> {
        Ok(self.original_cost.checked_sub(&self.salvage_value)?)
    }

    /// Rate applied to the opening book value each year
    ///
    /// Only meaningful for the declining methods.
    pub fn effective_rate(&self) -> Result<Decimal, DepreciationError> {
        match (self.method, self.depreciation_rate) {
            (_, Some(rate)) => Ok(rate.as_decimal()),
            (DepreciationMethod::DoubleDeclining, None) => {
                if self.useful_life_years == 0 {
                    return Err(DepreciationError::ZeroUsefulLife);
                }
                Ok(Decimal::TWO / Decimal::from(self.useful_life_years))
            }
            (method, None) => Err(DepreciationError::MissingRate { method }),
        }
    }

    /// Units used in year `year` (one-based)
    pub fn units_in_year(&self, year: u32) -> Decimal {
        year.checked_sub(1)
            .and_then(|i| self.units_per_year.get(i as usize))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Checks the record can produce a schedule
    ///
    /// # Errors
    ///
    /// - `ZeroUsefulLife` / `ZeroExpectedUnits` for zero divisors
    /// - `MissingRate` for declining balance without a rate
    /// - `Validation` for a life over `MAX_USEFUL_LIFE_YEARS`, negative
    ///   amounts, salvage above cost, or a missing units total
    pub fn validate(&self) -> Result<(), DepreciationError> {
        if self.useful_life_years == 0 {
            return Err(DepreciationError::ZeroUsefulLife);
        }
        if self.useful_life_years > MAX_USEFUL_LIFE_YEARS {
            return Err(DepreciationError::validation(format!(
                "useful life of {} years exceeds {} years",
                self.useful_life_years, MAX_USEFUL_LIFE_YEARS
            )));
        }
        if self.original_cost.currency() != self.salvage_value.currency() {
            return Err(DepreciationError::validation(format!(
                "salvage value in {} but cost in {}",
                self.salvage_value.currency(),
                self.original_cost.currency()
            )));
        }
        if self.original_cost.is_negative() || self.salvage_value.is_negative() {
            return Err(DepreciationError::validation("cost and salvage value cannot be negative"));
        }
        if self.salvage_value.amount() > self.original_cost.amount() {
            return Err(DepreciationError::validation(format!(
                "salvage value {} exceeds original cost {}",
                self.salvage_value, self.original_cost
            )));
        }
        if let Some(rate) = self.depreciation_rate {
            if rate.as_decimal() <= Decimal::ZERO {
                return Err(DepreciationError::validation("depreciation rate must be positive"));
            }
        }

        match self.method {
            DepreciationMethod::DecliningBalance | DepreciationMethod::DoubleDeclining => {
                self.effective_rate()?;
            }
            DepreciationMethod::UnitsOfProduction => {
                let total = self.total_expected_units.ok_or_else(|| {
                    DepreciationError::validation("units of production requires total expected units")
                })?;
                if total.is_zero() {
                    return Err(DepreciationError::ZeroExpectedUnits);
                }
                if total.is_sign_negative() {
                    return Err(DepreciationError::validation("total expected units cannot be negative"));
                }
                if self.units_per_year.iter().any(|u| u.is_sign_negative()) {
                    return Err(DepreciationError::validation("yearly units cannot be negative"));
                }
            }
            DepreciationMethod::StraightLine | DepreciationMethod::SumOfYears => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Currency, ErrorKind};
    use rust_decimal_macros::dec;

    fn record(method: DepreciationMethod) -> AssetDepreciation {
        AssetDepreciation::new(
            AssetId::new(),
            Money::new(dec!(1200), Currency::USD),
            Money::new(dec!(200), Currency::USD),
            5,
            method,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    #[test]
    fn test_zero_life_is_arithmetic_error() {
        let mut r = record(DepreciationMethod::StraightLine);
        r.useful_life_years = 0;
        assert_eq!(r.validate().unwrap_err().kind(), ErrorKind::Arithmetic);
    }

    #[test]
    fn test_salvage_above_cost_rejected() {
        let mut r = record(DepreciationMethod::StraightLine);
        r.salvage_value = Money::new(dec!(1500), Currency::USD);
        assert_eq!(r.validate().unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_declining_balance_needs_rate() {
        let r = record(DepreciationMethod::DecliningBalance);
        assert!(matches!(r.validate(), Err(DepreciationError::MissingRate { .. })));
        assert!(r.with_rate(Rate::new(dec!(0.3))).validate().is_ok());
    }

    #[test]
    fn test_double_declining_defaults_to_twice_straight_line() {
        let r = record(DepreciationMethod::DoubleDeclining);
        assert_eq!(r.effective_rate().unwrap(), dec!(0.4));
        let r = r.with_rate(Rate::new(dec!(0.25)));
        assert_eq!(r.effective_rate().unwrap(), dec!(0.25));
    }

    #[test]
    fn test_units_of_production_requirements() {
        let r = record(DepreciationMethod::UnitsOfProduction);
        assert_eq!(r.validate().unwrap_err().kind(), ErrorKind::Validation);

        let r = r.with_units(Decimal::ZERO, vec![]);
        assert!(matches!(r.validate(), Err(DepreciationError::ZeroExpectedUnits)));
        assert_eq!(r.validate().unwrap_err().kind(), ErrorKind::Arithmetic);
    }

    #[test]
    fn test_missing_usage_years_count_as_zero() {
        let r = record(DepreciationMethod::UnitsOfProduction).with_units(dec!(1000), vec![dec!(300)]);
        assert_eq!(r.units_in_year(1), dec!(300));
        assert_eq!(r.units_in_year(2), Decimal::ZERO);
        assert_eq!(r.units_in_year(0), Decimal::ZERO);
    }
}
