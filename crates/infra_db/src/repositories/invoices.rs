//! Invoice repository implementation
//!
//! An invoice is stored as a header row, its line items, and its payment and
//! credit applications. Reads hydrate all three plus the soft-delete state of
//! each application's source; writes replace items and upsert applications
//! inside one transaction guarded by the header's version.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Invoice status as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

/// Line item type as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invoice_item_type", rename_all = "snake_case")]
pub enum InvoiceItemType {
    Labor,
    Recurring,
    SetupFee,
    Expense,
    Product,
    Other,
}

/// Application source discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "application_source", rename_all = "snake_case")]
pub enum ApplicationSource {
    Payment,
    Credit,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub client_id: Uuid,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax: Option<Decimal>,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub version: i64,
    pub sent_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceItemRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub position: i32,
    pub description: String,
    pub item_type: InvoiceItemType,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount: Option<Decimal>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub source_kind: ApplicationSource,
    pub source_id: Uuid,
    pub target_invoice_id: Option<Uuid>,
    pub target_client_id: Option<Uuid>,
    pub amount: Decimal,
    pub currency: String,
    pub is_active: bool,
    pub applied_at: DateTime<Utc>,
    pub applied_by: Uuid,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<Uuid>,
    /// Whether the payment or credit row exists; ignored on write
    #[sqlx(default)]
    pub source_found: bool,
    /// Whether the payment or credit is soft-deleted; ignored on write
    #[sqlx(default)]
    pub source_deleted: bool,
}

/// A fully loaded invoice
#[derive(Debug, Clone)]
pub struct InvoiceRecord {
    pub invoice: InvoiceRow,
    pub items: Vec<InvoiceItemRow>,
    pub applications: Vec<ApplicationRow>,
}

/// Storage-level selection; balance conditions are evaluated after loading
#[derive(Debug, Clone, Default)]
pub struct InvoiceQuery {
    pub company_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub statuses: Vec<InvoiceStatus>,
    pub due_before: Option<NaiveDate>,
}

const INVOICE_COLUMNS: &str = r#"
    id, company_id, client_id, invoice_number, issue_date, due_date, currency,
    subtotal, tax, amount, status, version, sent_at, cancelled_at, cancelled_by, notes
"#;

/// Repository for invoices, their items, and their applications
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads an invoice with its items and applications
    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Option<InvoiceRecord>, DatabaseError> {
        let sql = format!("SELECT {} FROM invoices WHERE id = $1", INVOICE_COLUMNS);
        let Some(invoice) = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut records = self.hydrate(vec![invoice]).await?;
        Ok(records.pop())
    }

    /// Loads every invoice matching the query, ordered by due date
    #[instrument(skip(self))]
    pub async fn find(&self, query: &InvoiceQuery) -> Result<Vec<InvoiceRecord>, DatabaseError> {
        let statuses: Vec<String> = query.statuses.iter().map(|s| status_label(*s).to_string()).collect();
        let sql = format!(
            r#"
            SELECT {}
            FROM invoices
            WHERE ($1::uuid IS NULL OR company_id = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
              AND (cardinality($3::text[]) = 0 OR status::text = ANY($3))
              AND ($4::date IS NULL OR due_date < $4)
            ORDER BY due_date, id
            "#,
            INVOICE_COLUMNS
        );

        let invoices = sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(query.company_id)
            .bind(query.client_id)
            .bind(statuses)
            .bind(query.due_before)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = invoices.len(), "Invoices matched");
        self.hydrate(invoices).await
    }

    /// Returns the stored version, if the invoice exists
    pub async fn current_version(&self, id: Uuid) -> Result<Option<i64>, DatabaseError> {
        let version = sqlx::query_scalar::<_, i64>("SELECT version FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(version)
    }

    /// Inserts a new invoice at version 1
    #[instrument(skip(self, record), fields(invoice_id = %record.invoice.id))]
    pub async fn insert(&self, record: &InvoiceRecord) -> Result<i64, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let row = &record.invoice;

        let version = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO invoices (
                id, company_id, client_id, invoice_number, issue_date, due_date, currency,
                subtotal, tax, amount, status, version, sent_at, cancelled_at, cancelled_by, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1, $12, $13, $14, $15)
            RETURNING version
            "#,
        )
        .bind(row.id)
        .bind(row.company_id)
        .bind(row.client_id)
        .bind(&row.invoice_number)
        .bind(row.issue_date)
        .bind(row.due_date)
        .bind(&row.currency)
        .bind(row.subtotal)
        .bind(row.tax)
        .bind(row.amount)
        .bind(row.status)
        .bind(row.sent_at)
        .bind(row.cancelled_at)
        .bind(row.cancelled_by)
        .bind(&row.notes)
        .fetch_one(&mut *tx)
        .await?;

        write_children(&mut tx, record).await?;
        tx.commit().await?;
        Ok(version)
    }

    /// Updates an invoice if its stored version still equals `expected`
    ///
    /// # Errors
    ///
    /// - `VersionConflict` when another writer got there first
    /// - `NotFound` when the invoice does not exist
    #[instrument(skip(self, record), fields(invoice_id = %record.invoice.id))]
    pub async fn update(&self, record: &InvoiceRecord, expected: i64) -> Result<i64, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let row = &record.invoice;

        let updated = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE invoices SET
                invoice_number = $3,
                issue_date = $4,
                due_date = $5,
                subtotal = $6,
                tax = $7,
                amount = $8,
                status = $9,
                sent_at = $10,
                cancelled_at = $11,
                cancelled_by = $12,
                notes = $13,
                version = version + 1,
                updated_at = now()
            WHERE id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(row.id)
        .bind(expected)
        .bind(&row.invoice_number)
        .bind(row.issue_date)
        .bind(row.due_date)
        .bind(row.subtotal)
        .bind(row.tax)
        .bind(row.amount)
        .bind(row.status)
        .bind(row.sent_at)
        .bind(row.cancelled_at)
        .bind(row.cancelled_by)
        .bind(&row.notes)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(version) = updated else {
            tx.rollback().await?;
            return match self.current_version(row.id).await? {
                Some(actual) => Err(DatabaseError::VersionConflict {
                    entity: "invoice",
                    id: row.id.to_string(),
                    expected: expected as u64,
                    actual: actual as u64,
                }),
                None => Err(DatabaseError::not_found("Invoice", row.id)),
            };
        };

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = $1")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;
        write_children(&mut tx, record).await?;

        tx.commit().await?;
        debug!(version, "Invoice updated");
        Ok(version)
    }

    async fn hydrate(&self, invoices: Vec<InvoiceRow>) -> Result<Vec<InvoiceRecord>, DatabaseError> {
        if invoices.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = invoices.iter().map(|i| i.id).collect();

        let items = sqlx::query_as::<_, InvoiceItemRow>(
            r#"
            SELECT id, invoice_id, position, description, item_type, quantity, unit_price, discount
            FROM invoice_items
            WHERE invoice_id = ANY($1)
            ORDER BY invoice_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let applications = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT
                a.id, a.invoice_id, a.source_kind, a.source_id, a.target_invoice_id,
                a.target_client_id, a.amount, a.currency, a.is_active, a.applied_at,
                a.applied_by, a.voided_at, a.voided_by,
                COALESCE(p.id, c.id) IS NOT NULL AS source_found,
                COALESCE(p.deleted_at, c.deleted_at) IS NOT NULL AS source_deleted
            FROM invoice_applications a
            LEFT JOIN payments p ON a.source_kind = 'payment' AND p.id = a.source_id
            LEFT JOIN credits c ON a.source_kind = 'credit' AND c.id = a.source_id
            WHERE a.invoice_id = ANY($1)
            ORDER BY a.applied_at, a.id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_invoice: HashMap<Uuid, Vec<InvoiceItemRow>> = HashMap::new();
        for item in items {
            items_by_invoice.entry(item.invoice_id).or_default().push(item);
        }
        let mut applications_by_invoice: HashMap<Uuid, Vec<ApplicationRow>> = HashMap::new();
        for application in applications {
            applications_by_invoice.entry(application.invoice_id).or_default().push(application);
        }

        let records = invoices
            .into_iter()
            .map(|invoice| InvoiceRecord {
                items: items_by_invoice.remove(&invoice.id).unwrap_or_default(),
                applications: applications_by_invoice.remove(&invoice.id).unwrap_or_default(),
                invoice,
            })
            .collect();
        Ok(records)
    }
}

async fn write_children(
    tx: &mut Transaction<'_, Postgres>,
    record: &InvoiceRecord,
) -> Result<(), DatabaseError> {
    for item in &record.items {
        sqlx::query(
            r#"
            INSERT INTO invoice_items (
                id, invoice_id, position, description, item_type, quantity, unit_price, discount
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(item.id)
        .bind(record.invoice.id)
        .bind(item.position)
        .bind(&item.description)
        .bind(item.item_type)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.discount)
        .execute(&mut **tx)
        .await?;
    }

    // Applications are never deleted; voiding only flips the active flag.
    for application in &record.applications {
        sqlx::query(
            r#"
            INSERT INTO invoice_applications (
                id, invoice_id, source_kind, source_id, target_invoice_id, target_client_id,
                amount, currency, is_active, applied_at, applied_by, voided_at, voided_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                is_active = EXCLUDED.is_active,
                voided_at = EXCLUDED.voided_at,
                voided_by = EXCLUDED.voided_by
            "#,
        )
        .bind(application.id)
        .bind(record.invoice.id)
        .bind(application.source_kind)
        .bind(application.source_id)
        .bind(application.target_invoice_id)
        .bind(application.target_client_id)
        .bind(application.amount)
        .bind(&application.currency)
        .bind(application.is_active)
        .bind(application.applied_at)
        .bind(application.applied_by)
        .bind(application.voided_at)
        .bind(application.voided_by)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn status_label(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Draft => "draft",
        InvoiceStatus::Sent => "sent",
        InvoiceStatus::Partial => "partial",
        InvoiceStatus::Paid => "paid",
        InvoiceStatus::Overdue => "overdue",
        InvoiceStatus::Cancelled => "cancelled",
    }
}
