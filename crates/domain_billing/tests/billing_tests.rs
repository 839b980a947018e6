//! Comprehensive tests for domain_billing

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{
    ClientId, CompanyId, CreditId, Currency, ErrorKind, ExpenseId, FixedClock, Money,
    OperationContext, PaymentId, UserId,
};

use domain_billing::application::{Application, SourceState};
use domain_billing::invoice::{Invoice, InvoiceItem, InvoiceItemType, InvoiceStatus};
use domain_billing::ledger;
use domain_billing::reconciliation::{
    reconcile, reconcile_batch, unreconcile, BankTransaction, ReconcileOutcome, TargetSnapshot,
};
use domain_billing::{BillingError, InMemoryInvoiceStore, InvoiceFilter, InvoiceStore, LedgerService};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

/// Context whose `today` is the given date
fn ctx_on(company_id: CompanyId, today: NaiveDate) -> OperationContext {
    let instant = today.and_hms_opt(12, 0, 0).unwrap().and_utc();
    OperationContext::new(company_id, UserId::new()).with_clock(FixedClock(instant))
}

fn sent_invoice(ctx: &OperationContext, total: Decimal, due: NaiveDate) -> Invoice {
    let mut invoice = Invoice::new(
        ctx.company_id,
        ClientId::new(),
        "INV-2024-0001",
        due - Days::new(30),
        due,
        Currency::USD,
    );
    invoice
        .add_item(InvoiceItem::new("Managed services", InvoiceItemType::Recurring, usd(total)))
        .unwrap();
    invoice.send(ctx).unwrap();
    invoice
}

// ============================================================================
// Invoice Tests
// ============================================================================

mod invoice_tests {
    use super::*;

    #[test]
    fn test_new_invoice_is_empty_draft() {
        let invoice = Invoice::new(
            CompanyId::new(),
            ClientId::new(),
            "INV-1",
            date(2024, 1, 1),
            date(2024, 1, 31),
            Currency::USD,
        );

        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert!(invoice.amount.is_zero());
        assert!(invoice.applications.is_empty());
        assert_eq!(invoice.version, 0);
    }

    #[test]
    fn test_line_totals_with_discount() {
        let item = InvoiceItem::new("Firewall", InvoiceItemType::Product, usd(dec!(499.99)))
            .with_quantity(dec!(2))
            .with_discount(usd(dec!(50)));
        assert_eq!(item.total().amount(), dec!(949.98));
    }

    #[test]
    fn test_item_currency_must_match() {
        let mut invoice = Invoice::new(
            CompanyId::new(),
            ClientId::new(),
            "INV-1",
            date(2024, 1, 1),
            date(2024, 1, 31),
            Currency::USD,
        );
        let result = invoice.add_item(InvoiceItem::new(
            "Licence",
            InvoiceItemType::Product,
            Money::new(dec!(10), Currency::EUR),
        ));
        assert!(matches!(result, Err(BillingError::Validation(_))));
    }

    #[test]
    fn test_void_paid_invoice_with_payments_is_rejected() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 1, 10));
        let mut invoice = sent_invoice(&ctx, dec!(100), date(2024, 1, 31));
        let id = invoice.id;
        invoice.applications.push(Application::payment(PaymentId::new(), id, usd(dec!(100)), &ctx));
        ledger::update_payment_status(&mut invoice, ctx.today());
        assert_eq!(invoice.status, InvoiceStatus::Paid);

        let err = invoice.void(&ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }

    #[test]
    fn test_void_records_actor_and_is_idempotent() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 1, 10));
        let mut invoice = sent_invoice(&ctx, dec!(100), date(2024, 1, 31));

        invoice.void(&ctx).unwrap();
        invoice.void(&ctx).unwrap();

        assert_eq!(invoice.status, InvoiceStatus::Cancelled);
        assert_eq!(invoice.cancelled_by, Some(ctx.actor_id));
        assert_eq!(invoice.cancelled_at, Some(ctx.now()));
    }
}

// ============================================================================
// Ledger Tests
// ============================================================================

mod ledger_tests {
    use super::*;

    #[test]
    fn test_partial_then_paid_then_reverted() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 1, 10));
        let mut invoice = sent_invoice(&ctx, dec!(500), date(2024, 1, 31));
        let id = invoice.id;

        invoice.applications.push(Application::payment(PaymentId::new(), id, usd(dec!(200)), &ctx));
        ledger::update_payment_status(&mut invoice, ctx.today());
        assert_eq!(invoice.status, InvoiceStatus::Partial);
        assert_eq!(ledger::balance(&invoice).amount(), dec!(300.00));

        invoice.applications.push(Application::credit(CreditId::new(), id, usd(dec!(300)), &ctx));
        ledger::update_payment_status(&mut invoice, ctx.today());
        assert_eq!(invoice.status, InvoiceStatus::Paid);

        for app in invoice.applications.iter_mut() {
            app.void(&ctx);
        }
        ledger::update_payment_status(&mut invoice, ctx.today());
        assert_eq!(invoice.status, InvoiceStatus::Sent);
    }

    #[test]
    fn test_update_payment_status_is_idempotent() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 1, 10));
        let mut invoice = sent_invoice(&ctx, dec!(90), date(2024, 1, 31));
        let id = invoice.id;
        invoice.applications.push(Application::payment(PaymentId::new(), id, usd(dec!(45)), &ctx));

        assert!(ledger::update_payment_status(&mut invoice, ctx.today()).is_some());
        let snapshot = invoice.status;
        assert!(ledger::update_payment_status(&mut invoice, ctx.today()).is_none());
        assert_eq!(invoice.status, snapshot);
    }

    #[test]
    fn test_missing_source_is_skipped_not_fatal() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 1, 10));
        let mut invoice = sent_invoice(&ctx, dec!(90), date(2024, 1, 31));
        let id = invoice.id;
        invoice.applications.push(
            Application::payment(PaymentId::new(), id, usd(dec!(45)), &ctx)
                .with_source_state(SourceState::Missing),
        );
        invoice.applications.push(Application::payment(PaymentId::new(), id, usd(dec!(-5)), &ctx));

        let summary = ledger::summarize(&invoice);
        assert!(summary.total_paid.is_zero());
        assert_eq!(summary.excluded.len(), 2);
    }

    #[test]
    fn test_cancelled_invoice_is_not_overdue() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 3, 1));
        let mut invoice = sent_invoice(&ctx, dec!(90), date(2024, 1, 31));
        invoice.void(&ctx).unwrap();

        assert!(!ledger::is_overdue(&invoice, ctx.today()));
        assert!(ledger::update_payment_status(&mut invoice, ctx.today()).is_none());
    }

    #[test]
    fn test_refresh_overdue_only_moves_sent() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 3, 1));
        let overdue = sent_invoice(&ctx, dec!(90), date(2024, 2, 1));
        let current = sent_invoice(&ctx, dec!(90), date(2024, 3, 15));
        let mut partial = sent_invoice(&ctx, dec!(90), date(2024, 2, 1));
        let pid = partial.id;
        partial.applications.push(Application::payment(PaymentId::new(), pid, usd(dec!(10)), &ctx));
        ledger::update_payment_status(&mut partial, ctx.today());

        let mut invoices = vec![overdue, current, partial];
        let changes = ledger::refresh_overdue(&mut invoices, ctx.today());

        assert_eq!(changes.len(), 1);
        assert_eq!(invoices[0].status, InvoiceStatus::Overdue);
        assert_eq!(invoices[1].status, InvoiceStatus::Sent);
        assert_eq!(invoices[2].status, InvoiceStatus::Partial);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn balance_is_amount_minus_active_applications(
                total_cents in 1i64..10_000_000,
                applied in prop::collection::vec((1i64..500_000, any::<bool>(), any::<bool>()), 0..12),
            ) {
                let ctx = ctx_on(CompanyId::new(), date(2024, 1, 10));
                let mut invoice = sent_invoice(&ctx, Decimal::new(total_cents, 2), date(2024, 1, 31));
                let id = invoice.id;
                let mut expected_paid = Decimal::ZERO;

                for (cents, active, deleted) in applied {
                    let mut app = Application::payment(PaymentId::new(), id, usd(Decimal::new(cents, 2)), &ctx);
                    if deleted {
                        app = app.with_source_state(SourceState::SoftDeleted);
                    }
                    if !active {
                        app.void(&ctx);
                    }
                    if active && !deleted {
                        expected_paid += Decimal::new(cents, 2);
                    }
                    invoice.applications.push(app);
                }

                let summary = ledger::summarize(&invoice);
                prop_assert_eq!(summary.total_paid.amount(), expected_paid);
                prop_assert_eq!(summary.balance.amount(), invoice.amount.amount() - expected_paid);
            }

            #[test]
            fn status_update_is_idempotent(paid_cents in 0i64..30_000, day in 1u32..28) {
                let ctx = ctx_on(CompanyId::new(), date(2024, 2, day));
                let mut invoice = sent_invoice(&ctx, dec!(150), date(2024, 2, 10));
                let id = invoice.id;
                if paid_cents > 0 {
                    invoice.applications.push(
                        Application::payment(PaymentId::new(), id, usd(Decimal::new(paid_cents, 2)), &ctx),
                    );
                }

                ledger::sweep_status(&mut invoice, ctx.today());
                let settled = invoice.status;
                prop_assert!(ledger::update_payment_status(&mut invoice, ctx.today()).is_none());
                prop_assert_eq!(invoice.status, settled);
            }
        }
    }
}

// ============================================================================
// Reconciliation Tests
// ============================================================================

mod reconciliation_tests {
    use super::*;

    #[test]
    fn test_reconcile_records_actor_and_time() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 4, 2));
        let mut tx = BankTransaction::new(ctx.company_id, usd(dec!(250)), date(2024, 4, 1), "ACH ACME");
        let target = TargetSnapshot::payment(PaymentId::new(), ctx.company_id, usd(dec!(250)), date(2024, 4, 1));

        reconcile(&mut tx, &target, &ctx).unwrap();

        let link = tx.reconciliation.as_ref().unwrap();
        assert_eq!(link.target, target.target);
        assert_eq!(link.reconciled_by, ctx.actor_id);
        assert_eq!(link.reconciled_at, ctx.now());
    }

    #[test]
    fn test_reconcile_to_different_target_conflicts() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 4, 2));
        let mut tx = BankTransaction::new(ctx.company_id, usd(dec!(-80)), date(2024, 4, 1), "CARD");
        let first = TargetSnapshot::expense(ExpenseId::new(), ctx.company_id, usd(dec!(80)), date(2024, 4, 1));
        let second = TargetSnapshot::expense(ExpenseId::new(), ctx.company_id, usd(dec!(80)), date(2024, 4, 1));

        reconcile(&mut tx, &first, &ctx).unwrap();
        let err = reconcile(&mut tx, &second, &ctx).unwrap_err();

        assert!(matches!(err, BillingError::AlreadyReconciled(_)));
        assert_eq!(err.kind(), ErrorKind::Consistency);
    }

    #[test]
    fn test_reconcile_against_cancelled_invoice_is_rejected() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 4, 2));
        let mut tx = BankTransaction::new(ctx.company_id, usd(dec!(250)), date(2024, 4, 1), "ACH");
        let invoice = sent_invoice(&ctx, dec!(250), date(2024, 4, 30));
        let target = TargetSnapshot::payment(PaymentId::new(), ctx.company_id, usd(dec!(250)), date(2024, 4, 1))
            .with_invoice(invoice.id, InvoiceStatus::Cancelled);

        let err = reconcile(&mut tx, &target, &ctx).unwrap_err();
        assert!(matches!(err, BillingError::CancelledInvoice(id) if id == invoice.id));
        assert!(!tx.is_reconciled());
    }

    #[test]
    fn test_other_company_is_rejected() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 4, 2));
        let mut tx = BankTransaction::new(CompanyId::new(), usd(dec!(5)), date(2024, 4, 1), "X");
        let target = TargetSnapshot::payment(PaymentId::new(), ctx.company_id, usd(dec!(5)), date(2024, 4, 1));

        assert!(matches!(reconcile(&mut tx, &target, &ctx), Err(BillingError::CompanyMismatch(_))));
    }

    #[test]
    fn test_unreconcile_records_actor() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 4, 2));
        let mut tx = BankTransaction::new(ctx.company_id, usd(dec!(250)), date(2024, 4, 1), "ACH");
        let target = TargetSnapshot::payment(PaymentId::new(), ctx.company_id, usd(dec!(250)), date(2024, 4, 1));
        reconcile(&mut tx, &target, &ctx).unwrap();

        assert_eq!(unreconcile(&mut tx, &ctx).unwrap(), ReconcileOutcome::Unlinked);
        assert!(!tx.is_reconciled());
        assert_eq!(tx.unreconciled_by, Some(ctx.actor_id));
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let ctx = ctx_on(CompanyId::new(), date(2024, 4, 2));
        let invoice_id = sent_invoice(&ctx, dec!(10), date(2024, 4, 30)).id;
        let mut good = BankTransaction::new(ctx.company_id, usd(dec!(10)), date(2024, 4, 1), "A");
        let mut bad = BankTransaction::new(ctx.company_id, usd(dec!(20)), date(2024, 4, 1), "B");
        let mut also_good = BankTransaction::new(ctx.company_id, usd(dec!(30)), date(2024, 4, 1), "C");
        let t1 = TargetSnapshot::payment(PaymentId::new(), ctx.company_id, usd(dec!(10)), date(2024, 4, 1));
        let t2 = TargetSnapshot::payment(PaymentId::new(), ctx.company_id, usd(dec!(20)), date(2024, 4, 1))
            .with_invoice(invoice_id, InvoiceStatus::Cancelled);
        let t3 = TargetSnapshot::expense(ExpenseId::new(), ctx.company_id, usd(dec!(30)), date(2024, 4, 1));

        let report = reconcile_batch(
            vec![(&mut good, &t1), (&mut bad, &t2), (&mut also_good, &t3)],
            &ctx,
        );

        assert_eq!(report.linked, vec![good.id, also_good.id]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].transaction_id, bad.id);
        assert_eq!(report.failed[0].kind, ErrorKind::Consistency);
        assert!(!report.is_clean());
    }
}

// ============================================================================
// Service Tests
// ============================================================================

mod service_tests {
    use super::*;

    async fn stored_invoice(
        store: &InMemoryInvoiceStore,
        ctx: &OperationContext,
        total: Decimal,
        due: NaiveDate,
    ) -> Invoice {
        let mut invoice = sent_invoice(ctx, total, due);
        invoice.version = store.save(&invoice).await.unwrap();
        invoice
    }

    #[tokio::test]
    async fn test_post_application_updates_status_and_version() {
        let store = Arc::new(InMemoryInvoiceStore::new());
        let ctx = ctx_on(CompanyId::new(), date(2024, 1, 10));
        let invoice = stored_invoice(&store, &ctx, dec!(400), date(2024, 1, 31)).await;
        let service = LedgerService::new(store.clone());

        let app = Application::payment(PaymentId::new(), invoice.id, usd(dec!(100)), &ctx);
        let posted = service.post_application(invoice.id, app, &ctx).await.unwrap();

        assert_eq!(posted.invoice.status, InvoiceStatus::Partial);
        assert_eq!(posted.invoice.version, 2);
        assert_eq!(store.load(invoice.id).await.unwrap().status, InvoiceStatus::Partial);
    }

    #[tokio::test]
    async fn test_void_application_reverts_status() {
        let store = Arc::new(InMemoryInvoiceStore::new());
        let ctx = ctx_on(CompanyId::new(), date(2024, 1, 10));
        let invoice = stored_invoice(&store, &ctx, dec!(400), date(2024, 1, 31)).await;
        let service = LedgerService::new(store.clone());

        let app = Application::payment(PaymentId::new(), invoice.id, usd(dec!(400)), &ctx);
        let app_id = app.id;
        let paid = service.post_application(invoice.id, app, &ctx).await.unwrap();
        assert_eq!(paid.invoice.status, InvoiceStatus::Paid);

        let voided = service.void_application(invoice.id, app_id, &ctx).await.unwrap();
        assert_eq!(voided.invoice.status, InvoiceStatus::Sent);
        assert_eq!(voided.invoice.applications[0].voided_by, Some(ctx.actor_id));
    }

    #[tokio::test]
    async fn test_post_to_cancelled_invoice_fails() {
        let store = Arc::new(InMemoryInvoiceStore::new());
        let ctx = ctx_on(CompanyId::new(), date(2024, 1, 10));
        let invoice = stored_invoice(&store, &ctx, dec!(400), date(2024, 1, 31)).await;
        let service = LedgerService::new(store.clone());
        service.void_invoice(invoice.id, &ctx).await.unwrap();

        let app = Application::payment(PaymentId::new(), invoice.id, usd(dec!(1)), &ctx);
        let err = service.post_application(invoice.id, app, &ctx).await.unwrap_err();
        assert!(matches!(err, BillingError::CancelledInvoice(_)));
    }

    #[tokio::test]
    async fn test_concurrent_writer_gets_conflict() {
        let store = Arc::new(InMemoryInvoiceStore::new());
        let ctx = ctx_on(CompanyId::new(), date(2024, 1, 10));
        let invoice = stored_invoice(&store, &ctx, dec!(400), date(2024, 1, 31)).await;
        let service = LedgerService::new(store.clone());

        let stale = store.load(invoice.id).await.unwrap();
        let app = Application::payment(PaymentId::new(), invoice.id, usd(dec!(50)), &ctx);
        service.post_application(invoice.id, app, &ctx).await.unwrap();

        let err = store.save(&stale).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_refresh_overdue_scoped_to_company() {
        let store = Arc::new(InMemoryInvoiceStore::new());
        let ctx = ctx_on(CompanyId::new(), date(2024, 3, 1));
        let other = ctx_on(CompanyId::new(), date(2024, 3, 1));
        let mine = stored_invoice(&store, &ctx, dec!(100), date(2024, 2, 1)).await;
        let theirs = stored_invoice(&store, &other, dec!(100), date(2024, 2, 1)).await;
        stored_invoice(&store, &ctx, dec!(100), date(2024, 3, 20)).await;
        let service = LedgerService::new(store.clone());

        let report = service.refresh_overdue(&ctx).await.unwrap();

        assert_eq!(report.examined, 1);
        assert_eq!(report.transitioned.len(), 1);
        assert_eq!(report.transitioned[0].0, mine.id);
        assert_eq!(store.load(mine.id).await.unwrap().status, InvoiceStatus::Overdue);
        assert_eq!(store.load(theirs.id).await.unwrap().status, InvoiceStatus::Sent);

        let again = service.refresh_overdue(&ctx).await.unwrap();
        assert!(again.transitioned.is_empty());
    }

    #[tokio::test]
    async fn test_filter_finds_by_client() {
        let store = Arc::new(InMemoryInvoiceStore::new());
        let ctx = ctx_on(CompanyId::new(), date(2024, 3, 1));
        let invoice = stored_invoice(&store, &ctx, dec!(100), date(2024, 2, 1)).await;
        stored_invoice(&store, &ctx, dec!(100), date(2024, 2, 1)).await;

        let found = store
            .find(&InvoiceFilter::new().for_client(invoice.client_id))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, invoice.id);
    }
}
