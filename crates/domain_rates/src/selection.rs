//! Rate card selection
//!
//! When several cards match, the winner is chosen by, in order:
//! the default flag, a service-specific card over an all-services card,
//! the latest `effective.from`, and finally the smallest id.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};

use core_kernel::ClientId;

use crate::error::RateError;
use crate::rate_card::RateCard;

/// Scope for which a rate card is requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCardCriteria {
    pub client_id: ClientId,
    /// `None` only matches all-services cards
    pub service_type: Option<String>,
    pub date: NaiveDate,
}

impl RateCardCriteria {
    pub fn new(client_id: ClientId, service_type: Option<String>, date: NaiveDate) -> Self {
        Self {
            client_id,
            service_type,
            date,
        }
    }

    pub fn matches(&self, card: &RateCard) -> bool {
        card.is_active
            && card.client_id == self.client_id
            && self.service_matches(card)
            && card.effective.contains(self.date)
    }

    fn service_matches(&self, card: &RateCard) -> bool {
        if card.applies_to_all_services {
            return true;
        }
        match (&self.service_type, &card.service_type) {
            (Some(wanted), Some(offered)) => wanted == offered,
            _ => false,
        }
    }
}

fn preference(a: &RateCard, b: &RateCard) -> Ordering {
    let key = |c: &RateCard| {
        (
            Reverse(c.is_default),
            c.applies_to_all_services,
            Reverse(c.effective.from),
            c.id,
        )
    };
    key(a).cmp(&key(b))
}

/// Picks the applicable card for the criteria
///
/// # Errors
///
/// Returns `NoApplicableRateCard` if nothing matches
pub fn select_rate_card<'a>(
    cards: &'a [RateCard],
    criteria: &RateCardCriteria,
) -> Result<&'a RateCard, RateError> {
    cards
        .iter()
        .filter(|c| criteria.matches(c))
        .min_by(|a, b| preference(a, b))
        .ok_or_else(|| RateError::NoApplicableRateCard {
            client_id: criteria.client_id,
            service_type: criteria.service_type.clone(),
            date: criteria.date,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{CompanyId, Currency, EffectivePeriod, Money};
    use rust_decimal_macros::dec;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn card(client: ClientId, service: &str, from: NaiveDate) -> RateCard {
        RateCard::new(
            CompanyId::new(),
            client,
            service,
            service,
            Money::new(dec!(120), Currency::USD),
            EffectivePeriod::starting(from),
        )
    }

    #[test]
    fn test_default_wins_over_specific() {
        let client = ClientId::new();
        let specific = card(client, "network", date(1, 1));
        let general = card(client, "general", date(1, 1)).for_all_services().as_default();
        let cards = vec![specific, general.clone()];

        let criteria = RateCardCriteria::new(client, Some("network".into()), date(2, 1));
        assert_eq!(select_rate_card(&cards, &criteria).unwrap().id, general.id);
    }

    #[test]
    fn test_specific_then_latest() {
        let client = ClientId::new();
        let older = card(client, "network", date(1, 1));
        let newer = card(client, "network", date(3, 1));
        let general = card(client, "general", date(4, 1)).for_all_services();
        let cards = vec![older, newer.clone(), general];

        let criteria = RateCardCriteria::new(client, Some("network".into()), date(5, 1));
        assert_eq!(select_rate_card(&cards, &criteria).unwrap().id, newer.id);
    }

    #[test]
    fn test_window_and_inactive_excluded() {
        let client = ClientId::new();
        let mut expired = card(client, "network", date(1, 1));
        expired.effective = EffectivePeriod::new(date(1, 1), Some(date(1, 31))).unwrap();
        let mut inactive = card(client, "network", date(1, 1));
        inactive.is_active = false;
        let cards = vec![expired, inactive];

        let criteria = RateCardCriteria::new(client, Some("network".into()), date(2, 1));
        let err = select_rate_card(&cards, &criteria).unwrap_err();
        assert_eq!(err.kind(), core_kernel::ErrorKind::NotFound);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let client = ClientId::new();
        let mut c = card(client, "network", date(1, 1));
        c.effective = EffectivePeriod::new(date(1, 1), Some(date(1, 31))).unwrap();
        let cards = vec![c];

        for day in [date(1, 1), date(1, 31)] {
            let criteria = RateCardCriteria::new(client, Some("network".into()), day);
            assert!(select_rate_card(&cards, &criteria).is_ok());
        }
    }
}
