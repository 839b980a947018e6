//! Integration tests for domain_rates

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{ClientId, CompanyId, Currency, EffectivePeriod, ErrorKind, Money, UserId};
use domain_billing::InvoiceItemType;
use domain_rates::{
    bill_time_entries, RateCard, RateCardBook, RateCardCriteria, RoundingMethod, TimeEntry,
};

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn standard_card(company_id: CompanyId, client_id: ClientId) -> RateCard {
    RateCard::new(
        company_id,
        client_id,
        "Standard",
        "helpdesk",
        Money::new(dec!(100), Currency::USD),
        EffectivePeriod::starting(date(1, 1)),
    )
    .with_minimum_hours(dec!(1))
    .with_rounding(15, RoundingMethod::Up)
}

// ============================================================================
// Calculation Tests
// ============================================================================

mod calculation_tests {
    use super::*;

    #[test]
    fn test_documented_examples() {
        let card = standard_card(CompanyId::new(), ClientId::new());

        let cases = [
            (dec!(0.2), dec!(1.00), dec!(100.00)),
            (dec!(1.3), dec!(1.50), dec!(150.00)),
            (dec!(1.0), dec!(1.00), dec!(100.00)),
            (dec!(2.01), dec!(2.25), dec!(225.00)),
        ];

        for (actual, hours, amount) in cases {
            assert_eq!(card.calculate_billable_hours(actual).unwrap(), hours, "hours for {}", actual);
            assert_eq!(card.calculate_amount(actual).unwrap().amount(), amount, "amount for {}", actual);
        }
    }

    #[test]
    fn test_six_minute_increments() {
        let card = standard_card(CompanyId::new(), ClientId::new())
            .with_rounding(6, RoundingMethod::Up);
        assert_eq!(card.calculate_billable_hours(dec!(1.31)).unwrap(), dec!(1.40));
    }

    #[test]
    fn test_amount_rounds_half_up() {
        let mut card = standard_card(CompanyId::new(), ClientId::new());
        card.hourly_rate = Money::new(dec!(33.333), Currency::USD);
        card.rounding_method = RoundingMethod::None;
        assert_eq!(card.calculate_amount(dec!(1.5)).unwrap().amount(), dec!(50.00));
    }

    #[test]
    fn test_negative_hours_are_validation_errors() {
        let card = standard_card(CompanyId::new(), ClientId::new());
        let err = card.calculate_amount(dec!(-1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn billable_never_below_actual_or_minimum(cents in 0i64..2_000) {
                let card = standard_card(CompanyId::new(), ClientId::new());
                let actual = Decimal::new(cents, 2);
                let billable = card.calculate_billable_hours(actual).unwrap();

                prop_assert!(billable >= actual);
                prop_assert!(billable >= dec!(1));
                // always a whole number of quarter hours
                prop_assert_eq!((billable * dec!(4)).fract(), Decimal::ZERO);
            }

            #[test]
            fn round_down_never_exceeds_actual(cents in 100i64..2_000) {
                let card = standard_card(CompanyId::new(), ClientId::new())
                    .with_rounding(15, RoundingMethod::Down);
                let actual = Decimal::new(cents, 2);
                prop_assert!(card.calculate_billable_hours(actual).unwrap() <= actual);
            }
        }
    }
}

// ============================================================================
// Book and Time Entry Tests
// ============================================================================

mod billing_tests {
    use super::*;

    #[test]
    fn test_select_through_book() {
        let company = CompanyId::new();
        let client = ClientId::new();
        let mut book = RateCardBook::new(company);
        let id = book.insert(standard_card(company, client)).unwrap();

        let criteria = RateCardCriteria::new(client, Some("helpdesk".into()), date(6, 1));
        assert_eq!(book.select(&criteria).unwrap().id, id);

        let other_service = RateCardCriteria::new(client, Some("projects".into()), date(6, 1));
        assert_eq!(book.select(&other_service).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_bill_entries_collects_failures() {
        let company = CompanyId::new();
        let client = ClientId::new();
        let tech = UserId::new();
        let mut book = RateCardBook::new(company);
        book.insert(standard_card(company, client)).unwrap();

        let mut skipped = TimeEntry::new(client, tech, Some("helpdesk".into()), date(6, 3), dec!(3), "Internal");
        skipped.is_billable = false;
        let entries = vec![
            TimeEntry::new(client, tech, Some("helpdesk".into()), date(6, 3), dec!(0.2), "Password reset"),
            TimeEntry::new(client, tech, Some("helpdesk".into()), date(6, 4), dec!(1.3), "Printer issue"),
            TimeEntry::new(ClientId::new(), tech, Some("helpdesk".into()), date(6, 4), dec!(1), "Wrong client"),
            skipped,
        ];

        let run = bill_time_entries(&book, &entries);

        assert_eq!(run.billed.len(), 2);
        assert_eq!(run.unbilled.len(), 1);
        assert_eq!(run.unbilled[0].kind, ErrorKind::NotFound);

        let items = run.invoice_items();
        assert_eq!(items[1].item_type, InvoiceItemType::Labor);
        assert_eq!(items[1].quantity, dec!(1.50));
        assert_eq!(items[1].total().amount(), dec!(150.00));
    }
}
