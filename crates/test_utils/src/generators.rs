//! Property-Based Test Generators
//!
//! Proptest strategies that produce data respecting domain invariants.

use chrono::{Duration, NaiveDate};
use core_kernel::{AssetId, ClientId, Currency, EffectivePeriod, Money};
use domain_asset::{AssetDepreciation, DepreciationMethod};
use domain_rates::RoundingMethod;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for generating supported currencies
pub fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::USD),
        Just(Currency::EUR),
        Just(Currency::GBP),
        Just(Currency::CAD),
        Just(Currency::AUD),
        Just(Currency::NZD),
        Just(Currency::CHF),
        Just(Currency::JPY),
    ]
}

/// Strategy for generating positive amounts in minor units
pub fn positive_amount_minor_strategy() -> impl Strategy<Value = i64> {
    1i64..100_000_000i64
}

/// Strategy for generating positive USD Money values
pub fn usd_money_strategy() -> impl Strategy<Value = Money> {
    positive_amount_minor_strategy().prop_map(|amount| Money::from_minor(amount, Currency::USD))
}

/// Strategy for splitting a USD total into `1..=max_parts` positive parts
/// that add up to it exactly
pub fn usd_split_strategy(max_parts: usize) -> impl Strategy<Value = (Money, Vec<Money>)> {
    proptest::collection::vec(1i64..1_000_000i64, 1..=max_parts).prop_map(|cents| {
        let parts: Vec<Money> = cents.iter().map(|c| Money::from_minor(*c, Currency::USD)).collect();
        let total = Money::from_minor(cents.iter().sum(), Currency::USD);
        (total, parts)
    })
}

/// Strategy for worked hours with two decimals, 0.00 to 23.99
pub fn hours_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..2400i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for rounding methods
pub fn rounding_method_strategy() -> impl Strategy<Value = RoundingMethod> {
    prop_oneof![
        Just(RoundingMethod::Up),
        Just(RoundingMethod::Down),
        Just(RoundingMethod::Nearest),
        Just(RoundingMethod::None),
    ]
}

/// Strategy for common rounding increments in minutes
pub fn rounding_increment_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![Just(1u32), Just(5u32), Just(6u32), Just(10u32), Just(15u32), Just(30u32), Just(60u32)]
}

/// Strategy for dates in 2024
pub fn date_2024_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..366i64).prop_map(|days| {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(days)
    })
}

/// Strategy for valid effective windows, open-ended one time in four
pub fn effective_period_strategy() -> impl Strategy<Value = EffectivePeriod> {
    (date_2024_strategy(), proptest::option::weighted(0.75, 0i64..365i64)).prop_map(|(from, length)| {
        let to = length.map(|days| from + Duration::days(days));
        EffectivePeriod::new(from, to).unwrap()
    })
}

/// Strategy for generating ClientId
pub fn client_id_strategy() -> impl Strategy<Value = ClientId> {
    any::<[u8; 16]>().prop_map(|bytes| ClientId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

/// Strategy for depreciation methods that need no extra inputs
pub fn simple_method_strategy() -> impl Strategy<Value = DepreciationMethod> {
    prop_oneof![
        Just(DepreciationMethod::StraightLine),
        Just(DepreciationMethod::SumOfYears),
        Just(DepreciationMethod::DoubleDeclining),
    ]
}

/// Strategy for valid depreciation records of any method
///
/// Salvage is a whole percentage of cost; declining balance gets a rate and
/// units of production gets a usage history.
pub fn asset_depreciation_strategy() -> impl Strategy<Value = AssetDepreciation> {
    let method = prop_oneof![
        simple_method_strategy(),
        Just(DepreciationMethod::DecliningBalance),
        Just(DepreciationMethod::UnitsOfProduction),
    ];
    (
        1i64..10_000_000i64,
        0u32..=100u32,
        1u32..30u32,
        method,
        1i64..=150i64,
        proptest::collection::vec(0i64..5_000i64, 0..30),
    )
        .prop_map(|(cost_cents, salvage_pct, life, method, rate_pct, usage)| {
            let cost = Decimal::new(cost_cents, 2);
            let salvage = (cost * Decimal::from(salvage_pct) / Decimal::ONE_HUNDRED).round_dp(2);
            let record = AssetDepreciation::new(
                AssetId::new(),
                Money::new(cost, Currency::USD),
                Money::new(salvage, Currency::USD),
                life,
                method,
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            );
            match method {
                DepreciationMethod::DecliningBalance => {
                    record.with_rate(core_kernel::Rate::new(Decimal::new(rate_pct, 2)))
                }
                DepreciationMethod::UnitsOfProduction => record.with_units(
                    Decimal::from(20_000),
                    usage.into_iter().map(Decimal::from).collect(),
                ),
                _ => record,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn usd_money_is_always_positive(money in usd_money_strategy()) {
            prop_assert!(money.is_positive());
        }

        #[test]
        fn split_parts_add_up(split in usd_split_strategy(6)) {
            let (total, parts) = split;
            prop_assert_eq!(Money::try_sum(Currency::USD, &parts).unwrap(), total);
        }

        #[test]
        fn hours_are_non_negative(hours in hours_strategy()) {
            prop_assert!(hours >= Decimal::ZERO);
        }

        #[test]
        fn effective_period_never_inverted(period in effective_period_strategy()) {
            if let Some(to) = period.to {
                prop_assert!(to >= period.from);
            }
            prop_assert!(period.contains(period.from));
        }

        #[test]
        fn generated_records_validate(record in asset_depreciation_strategy()) {
            prop_assert!(record.validate().is_ok());
        }
    }
}
