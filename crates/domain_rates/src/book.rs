//! Rate card book
//!
//! Holds a company's rate cards and keeps exactly one default per client
//! that has any cards. Every write restores the invariant before returning.

use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{ClientId, CompanyId, RateCardId};

use crate::error::RateError;
use crate::rate_card::RateCard;
use crate::selection::{select_rate_card, RateCardCriteria};

/// A company's rate cards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateCardBook {
    pub company_id: CompanyId,
    cards: Vec<RateCard>,
}

impl RateCardBook {
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            cards: Vec::new(),
        }
    }

    pub fn cards(&self) -> &[RateCard] {
        &self.cards
    }

    pub fn get(&self, id: RateCardId) -> Option<&RateCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn for_client(&self, client_id: ClientId) -> impl Iterator<Item = &RateCard> {
        self.cards.iter().filter(move |c| c.client_id == client_id)
    }

    /// The client's default card
    pub fn default_for(&self, client_id: ClientId) -> Option<&RateCard> {
        self.for_client(client_id).find(|c| c.is_default)
    }

    /// Adds a card
    ///
    /// A default card demotes the client's previous default. The first card
    /// of a client becomes its default.
    pub fn insert(&mut self, card: RateCard) -> Result<RateCardId, RateError> {
        card.validate()?;
        if card.company_id != self.company_id {
            return Err(RateError::validation(format!(
                "rate card {} belongs to another company",
                card.id
            )));
        }
        if self.get(card.id).is_some() {
            return Err(RateError::validation(format!("rate card {} already exists", card.id)));
        }

        let id = card.id;
        let client_id = card.client_id;
        let make_default = card.is_default;
        self.cards.push(card);

        if make_default {
            self.set_default(id)?;
        } else {
            self.ensure_default(client_id);
        }
        Ok(id)
    }

    /// Makes a card its client's only default
    pub fn set_default(&mut self, id: RateCardId) -> Result<(), RateError> {
        let client_id = self.get(id).ok_or(RateError::RateCardNotFound(id))?.client_id;
        for card in self.cards.iter_mut().filter(|c| c.client_id == client_id) {
            card.is_default = card.id == id;
        }
        debug!(rate_card_id = %id, client_id = %client_id, "Default rate card set");
        Ok(())
    }

    /// Removes a card, promoting another one if it was the default
    pub fn remove(&mut self, id: RateCardId) -> Result<RateCard, RateError> {
        let index = self
            .cards
            .iter()
            .position(|c| c.id == id)
            .ok_or(RateError::RateCardNotFound(id))?;
        let removed = self.cards.remove(index);
        self.ensure_default(removed.client_id);
        Ok(removed)
    }

    /// Selects the card for the criteria
    pub fn select(&self, criteria: &RateCardCriteria) -> Result<&RateCard, RateError> {
        select_rate_card(&self.cards, criteria)
    }

    /// Promotes a card when the client has cards but no default. Active
    /// cards are preferred, then the latest start, then the smallest id.
    fn ensure_default(&mut self, client_id: ClientId) {
        if self.default_for(client_id).is_some() {
            return;
        }
        let promoted = self
            .for_client(client_id)
            .max_by(|a, b| {
                (a.is_active, a.effective.from, std::cmp::Reverse(a.id))
                    .cmp(&(b.is_active, b.effective.from, std::cmp::Reverse(b.id)))
            })
            .map(|c| c.id);

        if let Some(id) = promoted {
            if let Some(card) = self.cards.iter_mut().find(|c| c.id == id) {
                card.is_default = true;
                debug!(rate_card_id = %id, client_id = %client_id, "Rate card promoted to default");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::{Currency, EffectivePeriod, Money};
    use rust_decimal_macros::dec;

    fn card(book: &RateCardBook, client: ClientId, day: u32) -> RateCard {
        RateCard::new(
            book.company_id,
            client,
            "Remote support",
            "remote",
            Money::new(dec!(95), Currency::USD),
            EffectivePeriod::starting(NaiveDate::from_ymd_opt(2024, 1, day).unwrap()),
        )
    }

    fn defaults(book: &RateCardBook, client: ClientId) -> usize {
        book.for_client(client).filter(|c| c.is_default).count()
    }

    #[test]
    fn test_first_card_becomes_default() {
        let mut book = RateCardBook::new(CompanyId::new());
        let client = ClientId::new();
        let id = book.insert(card(&book, client, 1)).unwrap();

        assert_eq!(book.default_for(client).unwrap().id, id);
    }

    #[test]
    fn test_new_default_demotes_old() {
        let mut book = RateCardBook::new(CompanyId::new());
        let client = ClientId::new();
        book.insert(card(&book, client, 1)).unwrap();
        let second = book.insert(card(&book, client, 2).as_default()).unwrap();

        assert_eq!(defaults(&book, client), 1);
        assert_eq!(book.default_for(client).unwrap().id, second);
    }

    #[test]
    fn test_remove_default_promotes_latest() {
        let mut book = RateCardBook::new(CompanyId::new());
        let client = ClientId::new();
        let first = book.insert(card(&book, client, 1)).unwrap();
        let later = book.insert(card(&book, client, 9)).unwrap();
        book.insert(card(&book, client, 5)).unwrap();

        book.remove(first).unwrap();

        assert_eq!(defaults(&book, client), 1);
        assert_eq!(book.default_for(client).unwrap().id, later);
    }

    #[test]
    fn test_defaults_are_per_client() {
        let mut book = RateCardBook::new(CompanyId::new());
        let a = ClientId::new();
        let b = ClientId::new();
        book.insert(card(&book, a, 1)).unwrap();
        book.insert(card(&book, b, 1).as_default()).unwrap();

        assert_eq!(defaults(&book, a), 1);
        assert_eq!(defaults(&book, b), 1);
    }

    #[test]
    fn test_foreign_company_rejected() {
        let mut book = RateCardBook::new(CompanyId::new());
        let other = RateCardBook::new(CompanyId::new());
        assert!(book.insert(card(&other, ClientId::new(), 1)).is_err());
    }
}
