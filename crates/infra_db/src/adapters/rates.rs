//! PostgreSQL rate card adapter
//!
//! The in-memory `RateCardBook` decides which card is each client's default;
//! this adapter loads a book and mirrors its decisions to the table.

use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{ClientId, CompanyId, Currency, EffectivePeriod, Money, RateCardId};
use domain_rates::{RateCard, RateCardBook, RateError, RoundingMethod};

use crate::error::DatabaseError;
use crate::repositories::rate_cards::{
    RateCardRepository, RateCardRow, RoundingMethod as DbRoundingMethod,
};

#[derive(Debug, Clone)]
pub struct PostgresRateCardAdapter {
    repository: RateCardRepository,
}

impl PostgresRateCardAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: RateCardRepository::new(pool),
        }
    }

    /// Loads every card of a company into a book
    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn load_book(&self, company_id: CompanyId) -> Result<RateCardBook, RateError> {
        let rows = self
            .repository
            .list_for_company(*company_id.as_uuid())
            .await
            .map_err(db_to_rate_error)?;

        let mut book = RateCardBook::new(company_id);
        for row in rows {
            book.insert(row_to_rate_card(row)?)?;
        }
        debug!(cards = book.cards().len(), "Rate card book loaded");
        Ok(book)
    }

    /// Adds a card to the book and stores it
    pub async fn insert(&self, book: &mut RateCardBook, card: RateCard) -> Result<RateCardId, RateError> {
        let id = book.insert(card)?;
        self.store(book, id).await?;
        Ok(id)
    }

    /// Makes a card its client's default in the book and the table
    pub async fn set_default(&self, book: &mut RateCardBook, id: RateCardId) -> Result<(), RateError> {
        book.set_default(id)?;
        self.store(book, id).await
    }

    /// Removes a card, persisting whichever card the book promoted
    pub async fn remove(&self, book: &mut RateCardBook, id: RateCardId) -> Result<RateCard, RateError> {
        let removed = book.remove(id)?;
        let successor = book.default_for(removed.client_id).map(|c| *c.id.as_uuid());
        self.repository
            .delete(*id.as_uuid(), successor)
            .await
            .map_err(db_to_rate_error)?;
        Ok(removed)
    }

    async fn store(&self, book: &RateCardBook, id: RateCardId) -> Result<(), RateError> {
        let card = book.get(id).ok_or(RateError::RateCardNotFound(id))?;
        self.repository
            .upsert(&rate_card_to_row(card))
            .await
            .map_err(db_to_rate_error)
    }
}

fn db_to_rate_error(error: DatabaseError) -> RateError {
    match error {
        DatabaseError::ConstraintViolation(message) => RateError::Validation(message),
        other => RateError::Storage(other.to_string()),
    }
}

fn row_to_rate_card(row: RateCardRow) -> Result<RateCard, RateError> {
    let currency = Currency::from_code(&row.currency)?;
    let rounding_increment = row
        .rounding_increment
        .map(|minutes| {
            u32::try_from(minutes)
                .map_err(|_| RateError::Storage(format!("rate card {} has a negative increment", row.id)))
        })
        .transpose()?;

    Ok(RateCard {
        id: RateCardId::from(row.id),
        company_id: CompanyId::from(row.company_id),
        client_id: ClientId::from(row.client_id),
        name: row.name,
        service_type: row.service_type,
        applies_to_all_services: row.applies_to_all_services,
        hourly_rate: Money::new(row.hourly_rate, currency),
        effective: EffectivePeriod::new(row.effective_from, row.effective_to)?,
        minimum_hours: row.minimum_hours,
        rounding_increment,
        rounding_method: match row.rounding_method {
            DbRoundingMethod::Up => RoundingMethod::Up,
            DbRoundingMethod::Down => RoundingMethod::Down,
            DbRoundingMethod::Nearest => RoundingMethod::Nearest,
            DbRoundingMethod::None => RoundingMethod::None,
        },
        is_default: row.is_default,
        is_active: row.is_active,
    })
}

fn rate_card_to_row(card: &RateCard) -> RateCardRow {
    RateCardRow {
        id: *card.id.as_uuid(),
        company_id: *card.company_id.as_uuid(),
        client_id: *card.client_id.as_uuid(),
        name: card.name.clone(),
        service_type: card.service_type.clone(),
        applies_to_all_services: card.applies_to_all_services,
        hourly_rate: card.hourly_rate.amount(),
        currency: card.hourly_rate.currency().code().to_string(),
        effective_from: card.effective.from,
        effective_to: card.effective.to,
        minimum_hours: card.minimum_hours,
        rounding_increment: card.rounding_increment.map(|m| m.min(i32::MAX as u32) as i32),
        rounding_method: match card.rounding_method {
            RoundingMethod::Up => DbRoundingMethod::Up,
            RoundingMethod::Down => DbRoundingMethod::Down,
            RoundingMethod::Nearest => DbRoundingMethod::Nearest,
            RoundingMethod::None => DbRoundingMethod::None,
        },
        is_default: card.is_default,
        is_active: card.is_active,
    }
}
