//! Ledger service
//!
//! Coordinates a store with the pure ledger functions. Every mutation is a
//! load, a recompute, and a version-checked save; a concurrent writer makes
//! the save fail with `VersionConflict` and the caller may retry.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use core_kernel::{ApplicationId, ErrorKind, InvoiceId, OperationContext};

use crate::application::{Application, ApplicationTarget};
use crate::error::BillingError;
use crate::filter::InvoiceFilter;
use crate::invoice::{Invoice, InvoiceStatus};
use crate::ledger::{self, StatusChange};
use crate::store::InvoiceStore;

/// Invoice after a successful mutation
#[derive(Debug, Clone)]
pub struct PostingResult {
    pub invoice: Invoice,
    pub status_change: Option<StatusChange>,
}

/// Per-invoice failure during a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub invoice_id: InvoiceId,
    pub kind: ErrorKind,
    pub message: String,
}

/// Outcome of an overdue sweep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub examined: usize,
    pub transitioned: Vec<(InvoiceId, StatusChange)>,
    pub failed: Vec<SweepFailure>,
}

/// Application service for invoice ledger mutations
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn InvoiceStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn InvoiceStore>) -> Self {
        Self { store }
    }

    /// Adds a payment or credit application and refreshes the status
    ///
    /// # Errors
    ///
    /// - `CancelledInvoice` if the invoice is voided
    /// - `Validation` if the application targets another invoice, uses
    ///   another currency, or is not positive
    /// - `VersionConflict` if the invoice changed since it was loaded
    #[instrument(skip(self, application, ctx), fields(application_id = %application.id))]
    pub async fn post_application(
        &self,
        invoice_id: InvoiceId,
        application: Application,
        ctx: &OperationContext,
    ) -> Result<PostingResult, BillingError> {
        let mut invoice = self.load_owned(invoice_id, ctx).await?;

        if invoice.status == InvoiceStatus::Cancelled {
            return Err(BillingError::CancelledInvoice(invoice_id));
        }
        if application.target != (ApplicationTarget::Invoice { invoice_id }) {
            return Err(BillingError::validation("application targets a different record"));
        }
        if application.amount.currency() != invoice.currency {
            return Err(BillingError::validation(format!(
                "application currency {} does not match invoice currency {}",
                application.amount.currency(),
                invoice.currency
            )));
        }
        if !application.amount.is_positive() {
            return Err(BillingError::validation("application amount must be positive"));
        }

        invoice.applications.push(application);
        self.commit(invoice, ctx).await
    }

    /// Soft-voids an application and refreshes the status
    #[instrument(skip(self, ctx))]
    pub async fn void_application(
        &self,
        invoice_id: InvoiceId,
        application_id: ApplicationId,
        ctx: &OperationContext,
    ) -> Result<PostingResult, BillingError> {
        let mut invoice = self.load_owned(invoice_id, ctx).await?;
        invoice.application_mut(application_id)?.void(ctx);
        self.commit(invoice, ctx).await
    }

    /// Recomputes the payment status without other changes
    #[instrument(skip(self, ctx))]
    pub async fn refresh_status(
        &self,
        invoice_id: InvoiceId,
        ctx: &OperationContext,
    ) -> Result<PostingResult, BillingError> {
        let invoice = self.load_owned(invoice_id, ctx).await?;
        self.commit(invoice, ctx).await
    }

    /// Sends a draft invoice
    #[instrument(skip(self, ctx))]
    pub async fn send_invoice(
        &self,
        invoice_id: InvoiceId,
        ctx: &OperationContext,
    ) -> Result<PostingResult, BillingError> {
        let mut invoice = self.load_owned(invoice_id, ctx).await?;
        invoice.send(ctx)?;
        self.commit(invoice, ctx).await
    }

    /// Voids an invoice
    #[instrument(skip(self, ctx))]
    pub async fn void_invoice(
        &self,
        invoice_id: InvoiceId,
        ctx: &OperationContext,
    ) -> Result<PostingResult, BillingError> {
        let mut invoice = self.load_owned(invoice_id, ctx).await?;
        let from = invoice.status;
        invoice.void(ctx)?;
        let version = self.store.save(&invoice).await?;
        invoice.version = version;
        let status_change = (from != invoice.status).then_some(StatusChange {
            from,
            to: invoice.status,
        });
        Ok(PostingResult { invoice, status_change })
    }

    /// Moves past-due Sent invoices of the context company to Overdue
    ///
    /// Each invoice is saved on its own; a failure is recorded and the sweep
    /// continues.
    #[instrument(skip(self, ctx), fields(company_id = %ctx.company_id))]
    pub async fn refresh_overdue(&self, ctx: &OperationContext) -> Result<SweepReport, BillingError> {
        let today = ctx.today();
        let filter = InvoiceFilter::overdue_candidates(today).for_company(ctx.company_id);
        let candidates = self.store.find(&filter).await?;

        let mut report = SweepReport {
            examined: candidates.len(),
            ..SweepReport::default()
        };

        for mut invoice in candidates {
            let Some(change) = ledger::sweep_status(&mut invoice, today) else {
                continue;
            };
            match self.store.save(&invoice).await {
                Ok(_) => report.transitioned.push((invoice.id, change)),
                Err(e) => {
                    warn!(invoice_id = %invoice.id, error = %e, "Overdue refresh failed");
                    report.failed.push(SweepFailure {
                        invoice_id: invoice.id,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            examined = report.examined,
            transitioned = report.transitioned.len(),
            failed = report.failed.len(),
            "Overdue refresh complete"
        );
        Ok(report)
    }

    async fn load_owned(
        &self,
        invoice_id: InvoiceId,
        ctx: &OperationContext,
    ) -> Result<Invoice, BillingError> {
        let invoice = self.store.load(invoice_id).await?;
        if invoice.company_id != ctx.company_id {
            return Err(BillingError::CompanyMismatch(format!(
                "invoice {} belongs to {}",
                invoice_id, invoice.company_id
            )));
        }
        Ok(invoice)
    }

    async fn commit(
        &self,
        mut invoice: Invoice,
        ctx: &OperationContext,
    ) -> Result<PostingResult, BillingError> {
        let status_change = ledger::update_payment_status(&mut invoice, ctx.today());
        invoice.version = self.store.save(&invoice).await?;
        Ok(PostingResult { invoice, status_change })
    }
}
