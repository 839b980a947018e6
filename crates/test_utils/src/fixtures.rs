//! Pre-built Test Fixtures
//!
//! Ready-to-use test data for the billing domains. Fixtures are fixed and
//! predictable; use the builders when a test needs variation.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{
    AssetId, ClientId, CompanyId, Currency, EffectivePeriod, FixedClock, Money, OperationContext,
    UserId,
};
use domain_asset::{AssetDepreciation, DepreciationMethod};
use domain_contract::{AssetBillingRule, ContactAccessTier, TierBand, TierPolicy, TieredPricing, VolumeBasis};
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    pub fn usd(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    /// Standard monthly support fee
    pub fn usd_support_fee() -> Money {
        Money::new(dec!(500.00), Currency::USD)
    }

    /// Standard hourly rate
    pub fn usd_hourly_rate() -> Money {
        Money::new(dec!(125.00), Currency::USD)
    }

    pub fn usd_zero() -> Money {
        Money::zero(Currency::USD)
    }

    /// Creates a EUR amount for currency mismatch tests
    pub fn eur_100() -> Money {
        Money::new(dec!(100.00), Currency::EUR)
    }

    /// Creates a JPY amount (zero decimal places)
    pub fn jpy_10000() -> Money {
        Money::new(dec!(10000), Currency::JPY)
    }
}

/// Fixture for dates and instants
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Standard invoice issue date (Jan 1, 2024)
    pub fn issue_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Standard invoice due date (Jan 31, 2024)
    pub fn due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
    }

    /// An instant before the standard due date
    pub fn before_due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    }

    /// An instant a month after the standard due date
    pub fn after_due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    /// Standard work date for time entries
    pub fn work_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    /// Open-ended window starting on the issue date
    pub fn from_issue_date() -> EffectivePeriod {
        EffectivePeriod::starting(Self::issue_date())
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// Deterministic company id
    pub fn company_id() -> CompanyId {
        CompanyId::from_uuid(Uuid::parse_str("6f1c2a00-4b7e-4a52-9d0e-000000000001").unwrap())
    }

    /// A second company for isolation tests
    pub fn other_company_id() -> CompanyId {
        CompanyId::from_uuid(Uuid::parse_str("6f1c2a00-4b7e-4a52-9d0e-000000000002").unwrap())
    }

    pub fn client_id() -> ClientId {
        ClientId::from_uuid(Uuid::parse_str("6f1c2a00-4b7e-4a52-9d0e-000000000003").unwrap())
    }

    /// Deterministic actor
    pub fn user_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("6f1c2a00-4b7e-4a52-9d0e-000000000004").unwrap())
    }

    pub fn asset_id() -> AssetId {
        AssetId::from_uuid(Uuid::parse_str("6f1c2a00-4b7e-4a52-9d0e-000000000005").unwrap())
    }
}

/// Fixture for operation contexts
pub struct ContextFixtures;

impl ContextFixtures {
    /// Context for the fixture company frozen at `at`
    pub fn at(at: DateTime<Utc>) -> OperationContext {
        Self::for_company(IdFixtures::company_id(), at)
    }

    pub fn for_company(company_id: CompanyId, at: DateTime<Utc>) -> OperationContext {
        OperationContext::new(company_id, IdFixtures::user_id()).with_clock(FixedClock(at))
    }

    /// Context before the standard due date
    pub fn before_due() -> OperationContext {
        Self::at(TemporalFixtures::before_due())
    }

    /// Context after the standard due date
    pub fn after_due() -> OperationContext {
        Self::at(TemporalFixtures::after_due())
    }
}

/// Fixture for contract billing configuration
pub struct ContractFixtures;

impl ContractFixtures {
    /// Basic and admin portal access tiers
    pub fn contact_tiers() -> Vec<ContactAccessTier> {
        vec![
            ContactAccessTier {
                name: "basic".to_string(),
                rate: Money::new(dec!(5.00), Currency::USD),
                permissions: vec!["tickets".to_string()],
            },
            ContactAccessTier {
                name: "admin".to_string(),
                rate: Money::new(dec!(12.50), Currency::USD),
                permissions: vec!["tickets".to_string(), "billing".to_string()],
            },
        ]
    }

    /// Workstation and server per-asset rules
    pub fn asset_rules() -> Vec<(String, AssetBillingRule)> {
        vec![
            (
                "workstation".to_string(),
                AssetBillingRule::new(Money::new(dec!(45.00), Currency::USD))
                    .with_setup_fee(Money::new(dec!(25.00), Currency::USD)),
            ),
            (
                "server".to_string(),
                AssetBillingRule::new(Money::new(dec!(150.00), Currency::USD)),
            ),
        ]
    }

    /// Three asset bands: 1-10, 11-50, 51+
    pub fn asset_volume_pricing(policy: TierPolicy) -> TieredPricing {
        TieredPricing {
            basis: VolumeBasis::Assets,
            policy,
            bands: vec![
                TierBand { up_to: Some(10), unit_rate: Money::new(dec!(50), Currency::USD) },
                TierBand { up_to: Some(50), unit_rate: Money::new(dec!(40), Currency::USD) },
                TierBand { up_to: None, unit_rate: Money::new(dec!(30), Currency::USD) },
            ],
        }
    }
}

/// Fixture for depreciation records
pub struct AssetFixtures;

impl AssetFixtures {
    /// A $1,200 laptop with $200 salvage over five years
    pub fn laptop(method: DepreciationMethod) -> AssetDepreciation {
        AssetDepreciation::new(
            IdFixtures::asset_id(),
            Money::new(dec!(1200), Currency::USD),
            Money::new(dec!(200), Currency::USD),
            5,
            method,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        )
    }
}
