//! PostgreSQL adapter tests
//!
//! Each test starts its own container, so these need a Docker daemon:
//! `cargo test -p infra_db -- --ignored`.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use core_kernel::{
    ClientId, CompanyId, Currency, EffectivePeriod, FixedClock, Money, OperationContext, PaymentId,
    UserId,
};
use domain_billing::reconciliation::{reconcile, ReconcileOutcome, TargetSnapshot};
use domain_billing::{
    Application, BankTransaction, BillingError, Invoice, InvoiceFilter, InvoiceItem,
    InvoiceItemType, InvoiceStatus, InvoiceStore, LedgerService,
};
use domain_rates::RateCard;
use infra_db::{PostgresInvoiceStore, PostgresRateCardAdapter, PostgresReconciliationAdapter};
use test_utils::database::TestDatabase;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn usd(amount: rust_decimal::Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

fn context(company_id: CompanyId) -> OperationContext {
    OperationContext::new(company_id, UserId::new())
        .with_clock(FixedClock(Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap()))
}

fn sent_invoice(ctx: &OperationContext, number: &str) -> Invoice {
    let mut invoice = Invoice::new(
        ctx.company_id,
        ClientId::new(),
        number,
        date(2024, 6, 1),
        date(2024, 6, 30),
        Currency::USD,
    );
    invoice
        .add_item(InvoiceItem::new("Managed services", InvoiceItemType::Recurring, usd(dec!(500))))
        .unwrap();
    invoice.send(ctx).unwrap();
    invoice
}

async fn insert_payment(db: &TestDatabase, ctx: &OperationContext, invoice: &Invoice, amount: rust_decimal::Decimal) -> PaymentId {
    let payment_id = PaymentId::new();
    sqlx::query(
        "INSERT INTO payments (id, company_id, client_id, amount, currency, payment_date) \
         VALUES ($1, $2, $3, $4, 'USD', $5)",
    )
    .bind(*payment_id.as_uuid())
    .bind(*ctx.company_id.as_uuid())
    .bind(*invoice.client_id.as_uuid())
    .bind(amount)
    .bind(date(2024, 6, 10))
    .execute(db.pool())
    .await
    .unwrap();
    payment_id
}

// ============================================================================
// Invoice Store Tests
// ============================================================================

mod invoice_store_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_invoice_round_trips_with_applications() {
        let db = TestDatabase::new().await.unwrap();
        let store = PostgresInvoiceStore::new(db.pool().clone());
        let ctx = context(CompanyId::new());

        let mut invoice = sent_invoice(&ctx, "INV-2001");
        let payment_id = insert_payment(&db, &ctx, &invoice, dec!(200)).await;
        invoice
            .applications
            .push(Application::payment(payment_id, invoice.id, usd(dec!(200)), &ctx));

        let version = store.save(&invoice).await.unwrap();
        assert_eq!(version, 1);

        let loaded = store.load(invoice.id).await.unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.status, InvoiceStatus::Sent);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(domain_billing::ledger::balance(&loaded).amount(), dec!(300));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_stale_version_is_rejected() {
        let db = TestDatabase::new().await.unwrap();
        let store = PostgresInvoiceStore::new(db.pool().clone());
        let ctx = context(CompanyId::new());

        let invoice = sent_invoice(&ctx, "INV-2002");
        store.save(&invoice).await.unwrap();

        // Saving the unsaved copy again collides with the stored row.
        assert!(matches!(
            store.save(&invoice).await,
            Err(BillingError::VersionConflict { expected: 0, actual: 1, .. })
        ));

        let mut first = store.load(invoice.id).await.unwrap();
        let mut second = first.clone();
        first.notes = Some("called client".to_string());
        assert_eq!(store.save(&first).await.unwrap(), 2);

        second.notes = Some("stale edit".to_string());
        let err = store.save(&second).await.unwrap_err();
        assert!(matches!(err, BillingError::VersionConflict { expected: 1, actual: 2, .. }));
        assert_eq!(err.kind(), core_kernel::ErrorKind::Conflict);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_unreadable_application_does_not_stop_overdue_sweep() {
        let db = TestDatabase::new().await.unwrap();
        let store = Arc::new(PostgresInvoiceStore::new(db.pool().clone()));
        let ctx = context(CompanyId::new());

        let invoice = sent_invoice(&ctx, "INV-2003");
        store.save(&invoice).await.unwrap();
        let other = sent_invoice(&ctx, "INV-2004");
        store.save(&other).await.unwrap();

        sqlx::query(
            "INSERT INTO invoice_applications \
             (id, invoice_id, source_kind, source_id, target_invoice_id, amount, currency, applied_at, applied_by) \
             VALUES ($1, $2, 'payment', $3, $2, 50, 'SEK', now(), $4)",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(*invoice.id.as_uuid())
        .bind(uuid::Uuid::new_v4())
        .bind(*ctx.actor_id.as_uuid())
        .execute(db.pool())
        .await
        .unwrap();

        let found = store
            .find(&InvoiceFilter::new().for_company(ctx.company_id))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|i| i.applications.is_empty()));

        let report = LedgerService::new(store.clone()).refresh_overdue(&ctx).await.unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.transitioned.len(), 2);
        assert!(report.failed.is_empty());

        let stored_rows: i64 =
            sqlx::query_scalar("SELECT count(*) FROM invoice_applications WHERE invoice_id = $1")
                .bind(*invoice.id.as_uuid())
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(stored_rows, 1);
        assert_eq!(store.load(invoice.id).await.unwrap().status, InvoiceStatus::Overdue);
    }
}

// ============================================================================
// Rate Card Adapter Tests
// ============================================================================

mod rate_card_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_default_moves_and_is_promoted_on_remove() {
        let db = TestDatabase::new().await.unwrap();
        let adapter = PostgresRateCardAdapter::new(db.pool().clone());
        let company_id = CompanyId::new();
        let client_id = ClientId::new();
        let window = EffectivePeriod::starting(date(2024, 1, 1));

        let mut book = adapter.load_book(company_id).await.unwrap();
        let helpdesk = adapter
            .insert(
                &mut book,
                RateCard::new(company_id, client_id, "Helpdesk", "helpdesk", usd(dec!(100)), window),
            )
            .await
            .unwrap();
        let projects = adapter
            .insert(
                &mut book,
                RateCard::new(company_id, client_id, "Projects", "projects", usd(dec!(150)), window),
            )
            .await
            .unwrap();

        let reloaded = adapter.load_book(company_id).await.unwrap();
        assert_eq!(reloaded.default_for(client_id).map(|c| c.id), Some(helpdesk));

        adapter.set_default(&mut book, projects).await.unwrap();
        let reloaded = adapter.load_book(company_id).await.unwrap();
        assert_eq!(reloaded.default_for(client_id).map(|c| c.id), Some(projects));
        assert_eq!(reloaded.for_client(client_id).filter(|c| c.is_default).count(), 1);

        adapter.remove(&mut book, projects).await.unwrap();
        let reloaded = adapter.load_book(company_id).await.unwrap();
        assert_eq!(reloaded.cards().len(), 1);
        assert_eq!(reloaded.default_for(client_id).map(|c| c.id), Some(helpdesk));
    }
}

// ============================================================================
// Reconciliation Adapter Tests
// ============================================================================

mod reconciliation_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_reconciliation_is_persisted() {
        let db = TestDatabase::new().await.unwrap();
        let adapter = PostgresReconciliationAdapter::new(db.pool().clone());
        let store = PostgresInvoiceStore::new(db.pool().clone());
        let ctx = context(CompanyId::new());

        let mut invoice = sent_invoice(&ctx, "INV-2005");
        let payment_id = insert_payment(&db, &ctx, &invoice, dec!(500)).await;
        invoice
            .applications
            .push(Application::payment(payment_id, invoice.id, usd(dec!(500)), &ctx));
        store.save(&invoice).await.unwrap();

        let mut transaction = BankTransaction::new(ctx.company_id, usd(dec!(500)), date(2024, 6, 11), "ACH CREDIT");
        adapter.insert(&transaction).await.unwrap();
        assert_eq!(adapter.unreconciled(ctx.company_id).await.unwrap().len(), 1);

        let candidates = adapter.candidates(ctx.company_id, date(2024, 6, 11), 5).await.unwrap();
        assert_eq!(candidates.len(), 1);
        let target: &TargetSnapshot = &candidates[0];
        assert_eq!(target.invoice, Some((invoice.id, InvoiceStatus::Sent)));

        assert_eq!(reconcile(&mut transaction, target, &ctx).unwrap(), ReconcileOutcome::Linked);
        adapter.save(&transaction).await.unwrap();

        let loaded = adapter.load(transaction.id).await.unwrap();
        assert_eq!(loaded.reconciliation, transaction.reconciliation);
        assert!(adapter.unreconciled(ctx.company_id).await.unwrap().is_empty());
    }
}
