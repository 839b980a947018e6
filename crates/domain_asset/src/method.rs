//! Depreciation methods

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DepreciationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    StraightLine,
    DecliningBalance,
    DoubleDeclining,
    SumOfYears,
    UnitsOfProduction,
}

impl DepreciationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepreciationMethod::StraightLine => "straight_line",
            DepreciationMethod::DecliningBalance => "declining_balance",
            DepreciationMethod::DoubleDeclining => "double_declining",
            DepreciationMethod::SumOfYears => "sum_of_years",
            DepreciationMethod::UnitsOfProduction => "units_of_production",
        }
    }

    /// Methods whose final year absorbs rounding residue
    pub fn trues_up_final_year(&self) -> bool {
        matches!(self, DepreciationMethod::StraightLine | DepreciationMethod::SumOfYears)
    }
}

impl fmt::Display for DepreciationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepreciationMethod {
    type Err = DepreciationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "straight_line" => Ok(DepreciationMethod::StraightLine),
            "declining_balance" => Ok(DepreciationMethod::DecliningBalance),
            "double_declining" => Ok(DepreciationMethod::DoubleDeclining),
            "sum_of_years" => Ok(DepreciationMethod::SumOfYears),
            "units_of_production" => Ok(DepreciationMethod::UnitsOfProduction),
            other => Err(DepreciationError::validation(format!(
                "unknown depreciation method: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_str() {
        for method in [
            DepreciationMethod::StraightLine,
            DepreciationMethod::DecliningBalance,
            DepreciationMethod::DoubleDeclining,
            DepreciationMethod::SumOfYears,
            DepreciationMethod::UnitsOfProduction,
        ] {
            assert_eq!(method.as_str().parse::<DepreciationMethod>().unwrap(), method);
        }
        assert!("macrs".parse::<DepreciationMethod>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&DepreciationMethod::SumOfYears).unwrap();
        assert_eq!(json, "\"sum_of_years\"");
    }
}
