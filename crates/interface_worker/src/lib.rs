//! Billing worker
//!
//! Runs scheduled ledger maintenance against the PostgreSQL store. The
//! binary in `src/bin/worker.rs` wires configuration and logging; the sweep
//! itself only depends on an `InvoiceStore`.

pub mod config;
pub mod telemetry;

use std::sync::Arc;

use tracing::{info, instrument, warn};

use core_kernel::OperationContext;
use domain_billing::{BillingError, InvoiceStore, LedgerService, SweepReport};

pub use config::{LogFormat, WorkerConfig};

/// Moves past-due invoices of the context's company to overdue
#[instrument(skip(store, ctx), fields(company_id = %ctx.company_id))]
pub async fn run_overdue_sweep(
    store: Arc<dyn InvoiceStore>,
    ctx: &OperationContext,
) -> Result<SweepReport, BillingError> {
    let report = LedgerService::new(store).refresh_overdue(ctx).await?;

    for (invoice_id, change) in &report.transitioned {
        info!(invoice_id = %invoice_id, from = ?change.from, to = ?change.to, "Invoice status refreshed");
    }
    for failure in &report.failed {
        warn!(
            invoice_id = %failure.invoice_id,
            kind = ?failure.kind,
            message = %failure.message,
            "Invoice left unchanged"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use core_kernel::{ClientId, CompanyId, Currency, FixedClock, Money, UserId};
    use domain_billing::{InMemoryInvoiceStore, Invoice, InvoiceItem, InvoiceItemType, InvoiceStatus};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_sweep_marks_past_due_invoice_overdue() {
        let company = CompanyId::new();
        let ctx = OperationContext::new(company, UserId::new())
            .with_clock(FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));

        let mut invoice = Invoice::new(
            company,
            ClientId::new(),
            "INV-0001",
            date(2024, 1, 1),
            date(2024, 1, 31),
            Currency::USD,
        );
        invoice
            .add_item(InvoiceItem::new(
                "Monthly support",
                InvoiceItemType::Recurring,
                Money::new(dec!(500), Currency::USD),
            ))
            .unwrap();
        invoice.send(&ctx).unwrap();

        let store = Arc::new(InMemoryInvoiceStore::new());
        store.save(&invoice).await.unwrap();
        let id = invoice.id;

        let report = run_overdue_sweep(store.clone(), &ctx).await.unwrap();

        assert_eq!(report.examined, 1);
        assert_eq!(report.transitioned.len(), 1);
        assert_eq!(store.load(id).await.unwrap().status, InvoiceStatus::Overdue);
    }
}
