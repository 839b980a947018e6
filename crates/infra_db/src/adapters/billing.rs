//! PostgreSQL billing adapters
//!
//! `PostgresInvoiceStore` implements the billing domain's `InvoiceStore`
//! port; `PostgresReconciliationAdapter` loads and saves bank transactions
//! and reconciliation candidates. Both translate between repository rows and
//! domain values and map `DatabaseError` onto `BillingError`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use core_kernel::{
    ApplicationId, BankTransactionId, ClientId, CompanyId, CreditId, Currency, ExpenseId,
    InvoiceId, InvoiceItemId, Money, PaymentId, UserId,
};
use domain_billing::{
    Application, ApplicationSource, ApplicationTarget, BankTransaction, BillingError, Invoice,
    InvoiceFilter, InvoiceItem, InvoiceItemType, InvoiceStatus, InvoiceStore, Reconciliation,
    ReconciliationTarget, SourceState, TargetSnapshot,
};

use crate::error::DatabaseError;
use crate::repositories::bank_transactions::{
    BankTransactionRepository, BankTransactionRow, CandidateRow, ReconciliationKind,
};
use crate::repositories::invoices::{
    ApplicationRow, ApplicationSource as DbApplicationSource, InvoiceItemRow,
    InvoiceItemType as DbInvoiceItemType, InvoiceQuery, InvoiceRecord, InvoiceRepository,
    InvoiceRow, InvoiceStatus as DbInvoiceStatus,
};

/// PostgreSQL-backed implementation of the `InvoiceStore` port
#[derive(Debug, Clone)]
pub struct PostgresInvoiceStore {
    repository: InvoiceRepository,
}

impl PostgresInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: InvoiceRepository::new(pool),
        }
    }

    pub fn repository(&self) -> &InvoiceRepository {
        &self.repository
    }
}

#[async_trait]
impl InvoiceStore for PostgresInvoiceStore {
    #[instrument(skip(self), fields(invoice_id = %id))]
    async fn load(&self, id: InvoiceId) -> Result<Invoice, BillingError> {
        let record = self
            .repository
            .get(*id.as_uuid())
            .await
            .map_err(db_to_billing_error)?
            .ok_or(BillingError::InvoiceNotFound(id))?;
        record_to_invoice(record)
    }

    #[instrument(skip(self, invoice), fields(invoice_id = %invoice.id, version = invoice.version))]
    async fn save(&self, invoice: &Invoice) -> Result<u64, BillingError> {
        let record = invoice_to_record(invoice);

        let stored = if invoice.version == 0 {
            match self.repository.insert(&record).await {
                Err(DatabaseError::DuplicateEntry(_)) => {
                    let actual = self
                        .repository
                        .current_version(record.invoice.id)
                        .await
                        .map_err(db_to_billing_error)?
                        .unwrap_or_default();
                    return Err(BillingError::VersionConflict {
                        invoice_id: invoice.id,
                        expected: 0,
                        actual: actual as u64,
                    });
                }
                other => other,
            }
        } else {
            self.repository.update(&record, invoice.version as i64).await
        };

        match stored {
            Ok(version) => {
                debug!(version, "Invoice saved");
                Ok(version as u64)
            }
            Err(DatabaseError::VersionConflict { expected, actual, .. }) => Err(BillingError::VersionConflict {
                invoice_id: invoice.id,
                expected,
                actual,
            }),
            Err(DatabaseError::NotFound(_)) => Err(BillingError::InvoiceNotFound(invoice.id)),
            Err(e) => Err(db_to_billing_error(e)),
        }
    }

    #[instrument(skip(self, filter))]
    async fn find(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, BillingError> {
        let query = InvoiceQuery {
            company_id: filter.company_id.map(|id| *id.as_uuid()),
            client_id: filter.client_id.map(|id| *id.as_uuid()),
            statuses: filter.statuses.iter().copied().map(status_to_db).collect(),
            due_before: filter.due_before,
        };
        let records = self.repository.find(&query).await.map_err(db_to_billing_error)?;
        Ok(records_to_invoices(records, filter))
    }
}

/// Bank transaction persistence for reconciliation workflows
#[derive(Debug, Clone)]
pub struct PostgresReconciliationAdapter {
    repository: BankTransactionRepository,
}

impl PostgresReconciliationAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BankTransactionRepository::new(pool),
        }
    }

    pub async fn load(&self, id: BankTransactionId) -> Result<BankTransaction, BillingError> {
        let row = self.repository.get(*id.as_uuid()).await.map_err(db_to_billing_error)?;
        row_to_bank_transaction(row)
    }

    pub async fn unreconciled(&self, company_id: CompanyId) -> Result<Vec<BankTransaction>, BillingError> {
        self.repository
            .list_unreconciled(*company_id.as_uuid())
            .await
            .map_err(db_to_billing_error)?
            .into_iter()
            .map(row_to_bank_transaction)
            .collect()
    }

    pub async fn insert(&self, transaction: &BankTransaction) -> Result<(), BillingError> {
        self.repository
            .insert(&bank_transaction_to_row(transaction))
            .await
            .map_err(db_to_billing_error)
    }

    /// Persists the outcome of `reconcile` or `unreconcile`
    pub async fn save(&self, transaction: &BankTransaction) -> Result<(), BillingError> {
        self.repository
            .save_reconciliation(&bank_transaction_to_row(transaction))
            .await
            .map_err(db_to_billing_error)
    }

    /// Payments and expenses dated within `window_days` of `around`
    ///
    /// Rows that cannot be converted are skipped with a warning.
    pub async fn candidates(
        &self,
        company_id: CompanyId,
        around: NaiveDate,
        window_days: i64,
    ) -> Result<Vec<TargetSnapshot>, BillingError> {
        let window = chrono::Duration::days(window_days.max(0));
        let rows = self
            .repository
            .candidates(*company_id.as_uuid(), around - window, around + window)
            .await
            .map_err(db_to_billing_error)?;

        let snapshots = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                match row_to_target_snapshot(row) {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) => {
                        warn!(candidate_id = %id, error = %e, "Skipping unreadable reconciliation candidate");
                        None
                    }
                }
            })
            .collect();
        Ok(snapshots)
    }
}

// ============================================================================
// Error translation
// ============================================================================

fn db_to_billing_error(error: DatabaseError) -> BillingError {
    BillingError::Storage(error.to_string())
}

fn currency(code: &str) -> Result<Currency, BillingError> {
    Currency::from_code(code).map_err(|e| BillingError::Storage(format!("stored currency: {}", e)))
}

// ============================================================================
// Row -> domain
// ============================================================================

/// Converts search results, dropping invoices that cannot be read
///
/// Balance conditions of the filter are only known once applications are
/// loaded, so the whole filter is re-applied here.
fn records_to_invoices(records: Vec<InvoiceRecord>, filter: &InvoiceFilter) -> Vec<Invoice> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.invoice.id;
            match record_to_invoice(record) {
                Ok(invoice) => Some(invoice),
                Err(e) => {
                    warn!(invoice_id = %id, error = %e, "Skipping unreadable invoice");
                    None
                }
            }
        })
        .filter(|invoice| filter.matches(invoice))
        .collect()
}

fn record_to_invoice(record: InvoiceRecord) -> Result<Invoice, BillingError> {
    let InvoiceRecord {
        invoice: row,
        items,
        applications,
    } = record;
    let cur = currency(&row.currency)?;

    let items = items
        .into_iter()
        .map(|item| InvoiceItem {
            id: InvoiceItemId::from(item.id),
            description: item.description,
            item_type: item_type_from_db(item.item_type),
            quantity: item.quantity,
            unit_price: Money::new(item.unit_price, cur),
            discount: item.discount.map(|d| Money::new(d, cur)),
        })
        .collect();

    let applications = applications_from_rows(row.id, applications);

    Ok(Invoice {
        id: InvoiceId::from(row.id),
        company_id: CompanyId::from(row.company_id),
        client_id: ClientId::from(row.client_id),
        invoice_number: row.invoice_number,
        issue_date: row.issue_date,
        due_date: row.due_date,
        currency: cur,
        items,
        subtotal: Money::new(row.subtotal, cur),
        tax: row.tax.map(|t| Money::new(t, cur)),
        amount: Money::new(row.amount, cur),
        status: status_from_db(row.status),
        applications,
        version: row.version as u64,
        sent_at: row.sent_at,
        cancelled_at: row.cancelled_at,
        cancelled_by: row.cancelled_by.map(UserId::from),
        notes: row.notes,
    })
}

/// Converts application rows one at a time
///
/// An unreadable row is logged and left out; the ledger never sees it. Saves
/// only upsert the applications they carry, so the stored row is untouched.
fn applications_from_rows(invoice_id: uuid::Uuid, rows: Vec<ApplicationRow>) -> Vec<Application> {
    rows.into_iter()
        .filter_map(|row| {
            let application_id = row.id;
            match row_to_application(row) {
                Ok(application) => Some(application),
                Err(e) => {
                    warn!(
                        invoice_id = %invoice_id,
                        application_id = %application_id,
                        error = %e,
                        "Skipping unreadable application"
                    );
                    None
                }
            }
        })
        .collect()
}

fn row_to_application(row: ApplicationRow) -> Result<Application, BillingError> {
    let source = match row.source_kind {
        DbApplicationSource::Payment => ApplicationSource::Payment {
            payment_id: PaymentId::from(row.source_id),
        },
        DbApplicationSource::Credit => ApplicationSource::Credit {
            credit_id: CreditId::from(row.source_id),
        },
    };
    let target = match (row.target_invoice_id, row.target_client_id) {
        (Some(invoice_id), _) => ApplicationTarget::Invoice {
            invoice_id: InvoiceId::from(invoice_id),
        },
        (None, Some(client_id)) => ApplicationTarget::ClientBalance {
            client_id: ClientId::from(client_id),
        },
        (None, None) => {
            return Err(BillingError::Storage(format!("application {} has no target", row.id)));
        }
    };
    let source_state = match (row.source_found, row.source_deleted) {
        (false, _) => SourceState::Missing,
        (true, true) => SourceState::SoftDeleted,
        (true, false) => SourceState::Active,
    };

    Ok(Application {
        id: ApplicationId::from(row.id),
        source,
        target,
        amount: Money::new(row.amount, currency(&row.currency)?),
        is_active: row.is_active,
        source_state,
        applied_at: row.applied_at,
        applied_by: UserId::from(row.applied_by),
        voided_at: row.voided_at,
        voided_by: row.voided_by.map(UserId::from),
    })
}

fn row_to_bank_transaction(row: BankTransactionRow) -> Result<BankTransaction, BillingError> {
    let reconciliation = match (row.reconciled_kind, row.reconciled_id, row.reconciled_by, row.reconciled_at) {
        (Some(kind), Some(target_id), Some(by), Some(at)) => Some(Reconciliation {
            target: target_from_db(kind, target_id),
            reconciled_by: UserId::from(by),
            reconciled_at: at,
        }),
        (None, None, None, None) => None,
        _ => {
            return Err(BillingError::Storage(format!(
                "bank transaction {} has a partial reconciliation",
                row.id
            )));
        }
    };

    Ok(BankTransaction {
        id: BankTransactionId::from(row.id),
        company_id: CompanyId::from(row.company_id),
        amount: Money::new(row.amount, currency(&row.currency)?),
        posted_date: row.posted_date,
        description: row.description,
        reconciliation,
        unreconciled_by: row.unreconciled_by.map(UserId::from),
        unreconciled_at: row.unreconciled_at,
    })
}

fn row_to_target_snapshot(row: CandidateRow) -> Result<TargetSnapshot, BillingError> {
    let amount = Money::new(row.amount, currency(&row.currency)?);
    let company_id = CompanyId::from(row.company_id);
    let snapshot = match row.kind {
        ReconciliationKind::Payment => TargetSnapshot::payment(PaymentId::from(row.id), company_id, amount, row.date),
        ReconciliationKind::Expense => TargetSnapshot::expense(ExpenseId::from(row.id), company_id, amount, row.date),
    };
    Ok(match (row.invoice_id, row.invoice_status) {
        (Some(invoice_id), Some(status)) => snapshot.with_invoice(InvoiceId::from(invoice_id), status_from_db(status)),
        _ => snapshot,
    })
}

// ============================================================================
// Domain -> row
// ============================================================================

fn invoice_to_record(invoice: &Invoice) -> InvoiceRecord {
    let invoice_id = *invoice.id.as_uuid();

    let items = invoice
        .items
        .iter()
        .enumerate()
        .map(|(position, item)| InvoiceItemRow {
            id: *item.id.as_uuid(),
            invoice_id,
            position: position as i32,
            description: item.description.clone(),
            item_type: item_type_to_db(item.item_type),
            quantity: item.quantity,
            unit_price: item.unit_price.amount(),
            discount: item.discount.map(|d| d.amount()),
        })
        .collect();

    let applications = invoice
        .applications
        .iter()
        .map(|app| {
            let (source_kind, source_id) = match app.source {
                ApplicationSource::Payment { payment_id } => (DbApplicationSource::Payment, *payment_id.as_uuid()),
                ApplicationSource::Credit { credit_id } => (DbApplicationSource::Credit, *credit_id.as_uuid()),
            };
            let (target_invoice_id, target_client_id) = match app.target {
                ApplicationTarget::Invoice { invoice_id } => (Some(*invoice_id.as_uuid()), None),
                ApplicationTarget::ClientBalance { client_id } => (None, Some(*client_id.as_uuid())),
            };
            ApplicationRow {
                id: *app.id.as_uuid(),
                invoice_id,
                source_kind,
                source_id,
                target_invoice_id,
                target_client_id,
                amount: app.amount.amount(),
                currency: app.amount.currency().code().to_string(),
                is_active: app.is_active,
                applied_at: app.applied_at,
                applied_by: *app.applied_by.as_uuid(),
                voided_at: app.voided_at,
                voided_by: app.voided_by.map(|u| *u.as_uuid()),
                source_found: app.source_state != SourceState::Missing,
                source_deleted: app.source_state == SourceState::SoftDeleted,
            }
        })
        .collect();

    InvoiceRecord {
        invoice: InvoiceRow {
            id: invoice_id,
            company_id: *invoice.company_id.as_uuid(),
            client_id: *invoice.client_id.as_uuid(),
            invoice_number: invoice.invoice_number.clone(),
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            currency: invoice.currency.code().to_string(),
            subtotal: invoice.subtotal.round_to_currency().amount(),
            tax: invoice.tax.map(|t| t.round_to_currency().amount()),
            amount: invoice.amount.round_to_currency().amount(),
            status: status_to_db(invoice.status),
            version: invoice.version as i64,
            sent_at: invoice.sent_at,
            cancelled_at: invoice.cancelled_at,
            cancelled_by: invoice.cancelled_by.map(|u| *u.as_uuid()),
            notes: invoice.notes.clone(),
        },
        items,
        applications,
    }
}

fn bank_transaction_to_row(transaction: &BankTransaction) -> BankTransactionRow {
    let (reconciled_kind, reconciled_id, reconciled_by, reconciled_at) = match &transaction.reconciliation {
        Some(rec) => {
            let (kind, id) = match rec.target {
                ReconciliationTarget::Payment { payment_id } => (ReconciliationKind::Payment, *payment_id.as_uuid()),
                ReconciliationTarget::Expense { expense_id } => (ReconciliationKind::Expense, *expense_id.as_uuid()),
            };
            (Some(kind), Some(id), Some(*rec.reconciled_by.as_uuid()), Some(rec.reconciled_at))
        }
        None => (None, None, None, None),
    };

    BankTransactionRow {
        id: *transaction.id.as_uuid(),
        company_id: *transaction.company_id.as_uuid(),
        amount: transaction.amount.amount(),
        currency: transaction.amount.currency().code().to_string(),
        posted_date: transaction.posted_date,
        description: transaction.description.clone(),
        reconciled_kind,
        reconciled_id,
        reconciled_by,
        reconciled_at,
        unreconciled_by: transaction.unreconciled_by.map(|u| *u.as_uuid()),
        unreconciled_at: transaction.unreconciled_at,
    }
}

// ============================================================================
// Enum mapping
// ============================================================================

fn status_to_db(status: InvoiceStatus) -> DbInvoiceStatus {
    match status {
        InvoiceStatus::Draft => DbInvoiceStatus::Draft,
        InvoiceStatus::Sent => DbInvoiceStatus::Sent,
        InvoiceStatus::Partial => DbInvoiceStatus::Partial,
        InvoiceStatus::Paid => DbInvoiceStatus::Paid,
        InvoiceStatus::Overdue => DbInvoiceStatus::Overdue,
        InvoiceStatus::Cancelled => DbInvoiceStatus::Cancelled,
    }
}

fn status_from_db(status: DbInvoiceStatus) -> InvoiceStatus {
    match status {
        DbInvoiceStatus::Draft => InvoiceStatus::Draft,
        DbInvoiceStatus::Sent => InvoiceStatus::Sent,
        DbInvoiceStatus::Partial => InvoiceStatus::Partial,
        DbInvoiceStatus::Paid => InvoiceStatus::Paid,
        DbInvoiceStatus::Overdue => InvoiceStatus::Overdue,
        DbInvoiceStatus::Cancelled => InvoiceStatus::Cancelled,
    }
}

fn item_type_to_db(item_type: InvoiceItemType) -> DbInvoiceItemType {
    match item_type {
        InvoiceItemType::Labor => DbInvoiceItemType::Labor,
        InvoiceItemType::Recurring => DbInvoiceItemType::Recurring,
        InvoiceItemType::SetupFee => DbInvoiceItemType::SetupFee,
        InvoiceItemType::Expense => DbInvoiceItemType::Expense,
        InvoiceItemType::Product => DbInvoiceItemType::Product,
        InvoiceItemType::Other => DbInvoiceItemType::Other,
    }
}

fn item_type_from_db(item_type: DbInvoiceItemType) -> InvoiceItemType {
    match item_type {
        DbInvoiceItemType::Labor => InvoiceItemType::Labor,
        DbInvoiceItemType::Recurring => InvoiceItemType::Recurring,
        DbInvoiceItemType::SetupFee => InvoiceItemType::SetupFee,
        DbInvoiceItemType::Expense => InvoiceItemType::Expense,
        DbInvoiceItemType::Product => InvoiceItemType::Product,
        DbInvoiceItemType::Other => InvoiceItemType::Other,
    }
}

fn target_from_db(kind: ReconciliationKind, id: uuid::Uuid) -> ReconciliationTarget {
    match kind {
        ReconciliationKind::Payment => ReconciliationTarget::Payment {
            payment_id: PaymentId::from(id),
        },
        ReconciliationKind::Expense => ReconciliationTarget::Expense {
            expense_id: ExpenseId::from(id),
        },
    }
}
