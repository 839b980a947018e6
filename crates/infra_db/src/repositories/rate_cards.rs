//! Rate card repository implementation
//!
//! The partial unique index `uq_rate_cards_one_default` allows one default
//! card per client; writes that promote a card demote the previous default
//! in the same transaction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "rounding_method", rename_all = "snake_case")]
pub enum RoundingMethod {
    Up,
    Down,
    Nearest,
    None,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RateCardRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub service_type: Option<String>,
    pub applies_to_all_services: bool,
    pub hourly_rate: Decimal,
    pub currency: String,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub minimum_hours: Option<Decimal>,
    pub rounding_increment: Option<i32>,
    pub rounding_method: RoundingMethod,
    pub is_default: bool,
    pub is_active: bool,
}

/// Repository for client rate cards
#[derive(Debug, Clone)]
pub struct RateCardRepository {
    pool: PgPool,
}

impl RateCardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All rate cards of a company, oldest first
    #[instrument(skip(self))]
    pub async fn list_for_company(&self, company_id: Uuid) -> Result<Vec<RateCardRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, RateCardRow>(
            r#"
            SELECT
                id, company_id, client_id, name, service_type, applies_to_all_services,
                hourly_rate, currency, effective_from, effective_to, minimum_hours,
                rounding_increment, rounding_method, is_default, is_active
            FROM rate_cards
            WHERE company_id = $1
            ORDER BY client_id, created_at, id
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Rate cards loaded");
        Ok(rows)
    }

    /// Inserts or replaces a card, demoting the client's other default first
    /// when the card is a default
    #[instrument(skip(self, row), fields(rate_card_id = %row.id))]
    pub async fn upsert(&self, row: &RateCardRow) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        if row.is_default {
            sqlx::query(
                "UPDATE rate_cards SET is_default = false, updated_at = now() \
                 WHERE client_id = $1 AND id <> $2 AND is_default",
            )
            .bind(row.client_id)
            .bind(row.id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO rate_cards (
                id, company_id, client_id, name, service_type, applies_to_all_services,
                hourly_rate, currency, effective_from, effective_to, minimum_hours,
                rounding_increment, rounding_method, is_default, is_active
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                service_type = EXCLUDED.service_type,
                applies_to_all_services = EXCLUDED.applies_to_all_services,
                hourly_rate = EXCLUDED.hourly_rate,
                currency = EXCLUDED.currency,
                effective_from = EXCLUDED.effective_from,
                effective_to = EXCLUDED.effective_to,
                minimum_hours = EXCLUDED.minimum_hours,
                rounding_increment = EXCLUDED.rounding_increment,
                rounding_method = EXCLUDED.rounding_method,
                is_default = EXCLUDED.is_default,
                is_active = EXCLUDED.is_active,
                updated_at = now()
            "#,
        )
        .bind(row.id)
        .bind(row.company_id)
        .bind(row.client_id)
        .bind(&row.name)
        .bind(&row.service_type)
        .bind(row.applies_to_all_services)
        .bind(row.hourly_rate)
        .bind(&row.currency)
        .bind(row.effective_from)
        .bind(row.effective_to)
        .bind(row.minimum_hours)
        .bind(row.rounding_increment)
        .bind(row.rounding_method)
        .bind(row.is_default)
        .bind(row.is_active)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Deletes a card and promotes `successor` to default when given
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, successor: Option<Uuid>) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM rate_cards WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Rate card", id));
        }

        if let Some(next) = successor {
            sqlx::query("UPDATE rate_cards SET is_default = true, updated_at = now() WHERE id = $1")
                .bind(next)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
