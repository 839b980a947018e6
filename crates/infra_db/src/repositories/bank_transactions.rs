//! Bank transaction repository implementation

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::repositories::invoices::InvoiceStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "reconciliation_target", rename_all = "snake_case")]
pub enum ReconciliationKind {
    Payment,
    Expense,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BankTransactionRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub posted_date: NaiveDate,
    pub description: String,
    pub reconciled_kind: Option<ReconciliationKind>,
    pub reconciled_id: Option<Uuid>,
    pub reconciled_by: Option<Uuid>,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub unreconciled_by: Option<Uuid>,
    pub unreconciled_at: Option<DateTime<Utc>>,
}

/// A payment or expense a bank transaction could settle
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateRow {
    pub kind: ReconciliationKind,
    pub id: Uuid,
    pub company_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub date: NaiveDate,
    /// Invoice the payment is applied to, if any
    pub invoice_id: Option<Uuid>,
    pub invoice_status: Option<InvoiceStatus>,
}

const TRANSACTION_COLUMNS: &str = r#"
    id, company_id, amount, currency, posted_date, description,
    reconciled_kind, reconciled_id, reconciled_by, reconciled_at,
    unreconciled_by, unreconciled_at
"#;

/// Repository for imported bank transactions
#[derive(Debug, Clone)]
pub struct BankTransactionRepository {
    pool: PgPool,
}

impl BankTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<BankTransactionRow, DatabaseError> {
        let sql = format!("SELECT {} FROM bank_transactions WHERE id = $1", TRANSACTION_COLUMNS);
        sqlx::query_as::<_, BankTransactionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Bank transaction", id))
    }

    #[instrument(skip(self))]
    pub async fn list_unreconciled(&self, company_id: Uuid) -> Result<Vec<BankTransactionRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM bank_transactions \
             WHERE company_id = $1 AND reconciled_id IS NULL \
             ORDER BY posted_date, id",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query_as::<_, BankTransactionRow>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    #[instrument(skip(self, row), fields(transaction_id = %row.id))]
    pub async fn insert(&self, row: &BankTransactionRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO bank_transactions (id, company_id, amount, currency, posted_date, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(row.id)
        .bind(row.company_id)
        .bind(row.amount)
        .bind(&row.currency)
        .bind(row.posted_date)
        .bind(&row.description)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Writes the reconciliation columns of a transaction
    #[instrument(skip(self, row), fields(transaction_id = %row.id))]
    pub async fn save_reconciliation(&self, row: &BankTransactionRow) -> Result<(), DatabaseError> {
        let updated = sqlx::query(
            r#"
            UPDATE bank_transactions SET
                reconciled_kind = $2,
                reconciled_id = $3,
                reconciled_by = $4,
                reconciled_at = $5,
                unreconciled_by = $6,
                unreconciled_at = $7
            WHERE id = $1
            "#,
        )
        .bind(row.id)
        .bind(row.reconciled_kind)
        .bind(row.reconciled_id)
        .bind(row.reconciled_by)
        .bind(row.reconciled_at)
        .bind(row.unreconciled_by)
        .bind(row.unreconciled_at)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Bank transaction", row.id));
        }
        Ok(())
    }

    /// Live payments and expenses of a company within `from..=to`
    #[instrument(skip(self))]
    pub async fn candidates(
        &self,
        company_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CandidateRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT
                'payment'::reconciliation_target AS kind,
                p.id, p.company_id, p.amount, p.currency, p.payment_date AS date,
                app.invoice_id, i.status AS invoice_status
            FROM payments p
            LEFT JOIN LATERAL (
                SELECT a.invoice_id
                FROM invoice_applications a
                WHERE a.source_kind = 'payment' AND a.source_id = p.id AND a.is_active
                ORDER BY a.applied_at
                LIMIT 1
            ) app ON true
            LEFT JOIN invoices i ON i.id = app.invoice_id
            WHERE p.company_id = $1 AND p.deleted_at IS NULL
              AND p.payment_date BETWEEN $2 AND $3
            UNION ALL
            SELECT
                'expense'::reconciliation_target AS kind,
                e.id, e.company_id, e.amount, e.currency, e.expense_date AS date,
                NULL::uuid AS invoice_id, NULL::invoice_status AS invoice_status
            FROM expenses e
            WHERE e.company_id = $1 AND e.expense_date BETWEEN $2 AND $3
            "#,
        )
        .bind(company_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
