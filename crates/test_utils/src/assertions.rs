//! Custom Test Assertions
//!
//! Assertion helpers for domain types that give more meaningful failure
//! messages than standard assertions.

use core_kernel::{EffectivePeriod, Money};
use domain_asset::{AssetDepreciation, ScheduleEntry};
use domain_billing::{ledger, Invoice, InvoiceStatus};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(
        money.is_zero(),
        "Expected zero money, got {} {}",
        money.currency().symbol(),
        money.amount()
    );
}

/// Asserts that money values sum to a total
///
/// # Panics
///
/// Panics if the parts mix currencies or the sum doesn't equal the total
pub fn assert_money_sum_equals(parts: &[Money], total: &Money) {
    let sum = Money::try_sum(total.currency(), parts).expect("Currency mismatch in sum");

    assert_eq!(
        sum.amount(),
        total.amount(),
        "Sum of parts ({}) doesn't equal total ({})",
        sum.amount(),
        total.amount()
    );
}

/// Asserts an invoice's status and outstanding balance together
pub fn assert_invoice_state(invoice: &Invoice, status: InvoiceStatus, balance: Decimal) {
    assert_eq!(
        invoice.status, status,
        "Invoice {} has status {}, expected {}",
        invoice.invoice_number, invoice.status, status
    );
    let actual = ledger::balance(invoice).amount();
    assert_eq!(
        actual, balance,
        "Invoice {} has balance {}, expected {}",
        invoice.invoice_number, actual, balance
    );
}

/// Asserts that a window contains a date
pub fn assert_period_contains(period: &EffectivePeriod, date: chrono::NaiveDate) {
    assert!(period.contains(date), "Period {:?} does not contain {}", period, date);
}

/// Asserts the schedule-level guarantees every depreciation method keeps:
/// one entry per year, non-negative charges, accumulation that adds up, and
/// book values that never drop below salvage
pub fn assert_schedule_consistent(record: &AssetDepreciation, schedule: &[ScheduleEntry]) {
    assert_eq!(
        schedule.len() as u32,
        record.useful_life_years,
        "Schedule has {} entries for a {}-year life",
        schedule.len(),
        record.useful_life_years
    );

    let mut accumulated = Decimal::ZERO;
    for entry in schedule {
        assert!(
            !entry.annual_depreciation.is_negative(),
            "Year {} has negative depreciation {}",
            entry.year,
            entry.annual_depreciation
        );
        accumulated += entry.annual_depreciation.amount();
        assert_eq!(
            entry.accumulated_depreciation.amount(),
            accumulated,
            "Year {} accumulated {} but the annual charges add up to {}",
            entry.year,
            entry.accumulated_depreciation,
            accumulated
        );
        assert!(
            entry.book_value.amount() >= record.salvage_value.amount(),
            "Year {} book value {} is below salvage {}",
            entry.year,
            entry.book_value,
            record.salvage_value
        );
    }
}

/// Asserts that a result is Ok and returns the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Asserts that a result is an Err of the given error kind and returns the error
#[macro_export]
macro_rules! assert_err_kind {
    ($result:expr, $kind:expr) => {
        match $result {
            Ok(value) => panic!("Expected Err of kind {:?}, got Ok({:?})", $kind, value),
            Err(e) => {
                assert_eq!(e.kind(), $kind, "Error {:?} has the wrong kind", e);
                e
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assert_money_approx_eq_passes() {
        let m1 = Money::new(dec!(100.001), Currency::USD);
        let m2 = Money::new(dec!(100.002), Currency::USD);
        assert_money_approx_eq(&m1, &m2, dec!(0.01));
    }

    #[test]
    #[should_panic(expected = "Currency mismatch")]
    fn test_assert_money_approx_eq_currency_mismatch() {
        let m1 = Money::new(dec!(100.00), Currency::USD);
        let m2 = Money::new(dec!(100.00), Currency::EUR);
        assert_money_approx_eq(&m1, &m2, dec!(0.01));
    }

    #[test]
    fn test_assert_money_sum_equals() {
        let parts = vec![
            Money::new(dec!(33.34), Currency::USD),
            Money::new(dec!(33.33), Currency::USD),
            Money::new(dec!(33.33), Currency::USD),
        ];
        assert_money_sum_equals(&parts, &Money::new(dec!(100.00), Currency::USD));
    }

    #[test]
    #[should_panic(expected = "Expected zero money")]
    fn test_assert_money_zero_fails_for_positive() {
        assert_money_zero(&Money::new(dec!(0.01), Currency::USD));
    }
}
