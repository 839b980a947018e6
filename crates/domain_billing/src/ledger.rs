//! Invoice ledger calculations
//!
//! Paid and outstanding amounts are always derived from the applications on
//! a hydrated invoice, never stored separately.
//!
//! # Invariants
//!
//! - `balance = amount - total_paid`, rounded half away from zero to 2 places
//! - Overpayment yields a negative balance; it is not clamped
//! - Inactive applications and applications whose payment is soft-deleted
//!   never count toward `total_paid`
//! - Draft and Cancelled invoices are never moved by automatic transitions

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use core_kernel::{ApplicationId, InvoiceId, Money};

use crate::application::Exclusion;
use crate::filter::InvoiceFilter;
use crate::invoice::{Invoice, InvoiceStatus};

/// Breakdown of what has been applied to an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub paid_by_payments: Money,
    pub paid_by_credits: Money,
    pub total_paid: Money,
    pub balance: Money,
    /// Applications left out of the totals, with the reason
    pub excluded: Vec<(ApplicationId, Exclusion)>,
}

/// Aggregates the active applications on an invoice
///
/// Malformed application records are logged and skipped so one bad row
/// cannot break the aggregation.
pub fn summarize(invoice: &Invoice) -> PaymentSummary {
    let currency = invoice.currency;
    let mut payments = Money::zero(currency);
    let mut credits = Money::zero(currency);
    let mut excluded = Vec::new();

    for app in &invoice.applications {
        let verdict = app.counts_toward(invoice.id).and_then(|()| {
            if app.amount.currency() != currency {
                Err(Exclusion::CurrencyMismatch)
            } else {
                Ok(())
            }
        });

        match verdict {
            Ok(()) => {
                let bucket = if app.is_payment() { &mut payments } else { &mut credits };
                *bucket = Money::new(bucket.amount() + app.amount.amount(), currency);
            }
            Err(reason) => {
                if reason.is_malformed() {
                    warn!(
                        invoice_id = %invoice.id,
                        application_id = %app.id,
                        reason = ?reason,
                        "Skipping malformed application"
                    );
                }
                excluded.push((app.id, reason));
            }
        }
    }

    let payments = payments.round_to_currency();
    let credits = credits.round_to_currency();
    let total_paid = Money::new(payments.amount() + credits.amount(), currency).round_to_currency();
    let balance =
        Money::new(invoice.amount.amount() - total_paid.amount(), currency).round_to_currency();

    PaymentSummary {
        paid_by_payments: payments,
        paid_by_credits: credits,
        total_paid,
        balance,
        excluded,
    }
}

/// Sum of active payment and credit applications
pub fn total_paid(invoice: &Invoice) -> Money {
    summarize(invoice).total_paid
}

/// Amount still owed; negative when overpaid
pub fn balance(invoice: &Invoice) -> Money {
    summarize(invoice).balance
}

pub fn is_fully_paid(invoice: &Invoice) -> bool {
    !balance(invoice).is_positive()
}

/// Computed from dates and balance, independent of the persisted status
pub fn is_overdue(invoice: &Invoice, today: NaiveDate) -> bool {
    invoice.status.is_auto_transitionable()
        && invoice.due_date < today
        && balance(invoice).is_positive()
}

/// The status an invoice should have given its balance
///
/// Only an invoice that is already Overdue can stay Overdue here; moving a
/// Sent invoice to Overdue is the job of [`sweep_status`].
pub fn resolve_status(invoice: &Invoice, today: NaiveDate) -> InvoiceStatus {
    if !invoice.status.is_auto_transitionable() {
        return invoice.status;
    }

    let balance = balance(invoice);
    if !balance.is_positive() {
        InvoiceStatus::Paid
    } else if balance.amount() < invoice.amount.amount() {
        InvoiceStatus::Partial
    } else if invoice.status == InvoiceStatus::Overdue && invoice.due_date < today {
        InvoiceStatus::Overdue
    } else {
        InvoiceStatus::Sent
    }
}

/// A status transition applied to an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: InvoiceStatus,
    pub to: InvoiceStatus,
}

/// Brings the invoice status in line with its balance
///
/// Idempotent: a second call with the same applications returns `None`.
pub fn update_payment_status(invoice: &mut Invoice, today: NaiveDate) -> Option<StatusChange> {
    let to = resolve_status(invoice, today);
    apply(invoice, to)
}

/// The overdue sweep step for one invoice
///
/// Resolves the payment status, then moves an unpaid Sent invoice that is
/// past due to Overdue.
pub fn sweep_status(invoice: &mut Invoice, today: NaiveDate) -> Option<StatusChange> {
    let mut to = resolve_status(invoice, today);
    // Sent here implies nothing has been paid yet
    if to == InvoiceStatus::Sent && invoice.due_date < today {
        to = InvoiceStatus::Overdue;
    }
    apply(invoice, to)
}

/// Moves every Sent, past-due, unpaid invoice in the slice to Overdue
pub fn refresh_overdue(invoices: &mut [Invoice], today: NaiveDate) -> Vec<(InvoiceId, StatusChange)> {
    let filter = InvoiceFilter::overdue_candidates(today);
    invoices
        .iter_mut()
        .filter(|invoice| filter.matches(invoice))
        .filter_map(|invoice| sweep_status(invoice, today).map(|change| (invoice.id, change)))
        .collect()
}

fn apply(invoice: &mut Invoice, to: InvoiceStatus) -> Option<StatusChange> {
    let from = invoice.status;
    if from == to {
        return None;
    }
    debug!(invoice_id = %invoice.id, %from, %to, "Invoice status transition");
    invoice.status = to;
    Some(StatusChange { from, to })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{Application, SourceState};
    use crate::invoice::{InvoiceItem, InvoiceItemType};
    use core_kernel::{ClientId, CompanyId, CreditId, Currency, OperationContext, PaymentId, UserId};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sent_invoice(total: rust_decimal::Decimal) -> (Invoice, OperationContext) {
        let ctx = OperationContext::new(CompanyId::new(), UserId::new());
        let mut invoice = Invoice::new(
            ctx.company_id,
            ClientId::new(),
            "INV-1",
            date(2024, 1, 1),
            date(2024, 1, 31),
            Currency::USD,
        );
        invoice
            .add_item(InvoiceItem::new("Managed services", InvoiceItemType::Recurring, Money::new(total, Currency::USD)))
            .unwrap();
        invoice.send(&ctx).unwrap();
        (invoice, ctx)
    }

    #[test]
    fn test_balance_excludes_inactive_and_deleted() {
        let (mut invoice, ctx) = sent_invoice(dec!(300));
        let id = invoice.id;
        invoice.applications.push(Application::payment(PaymentId::new(), id, Money::new(dec!(100), Currency::USD), &ctx));
        invoice.applications.push(Application::credit(CreditId::new(), id, Money::new(dec!(25.50), Currency::USD), &ctx));
        invoice.applications.push(
            Application::payment(PaymentId::new(), id, Money::new(dec!(40), Currency::USD), &ctx)
                .with_source_state(SourceState::SoftDeleted),
        );
        let mut voided = Application::payment(PaymentId::new(), id, Money::new(dec!(60), Currency::USD), &ctx);
        voided.void(&ctx);
        invoice.applications.push(voided);

        let summary = summarize(&invoice);
        assert_eq!(summary.total_paid.amount(), dec!(125.50));
        assert_eq!(summary.balance.amount(), dec!(174.50));
        assert_eq!(summary.excluded.len(), 2);
    }

    #[test]
    fn test_overpayment_gives_negative_balance() {
        let (mut invoice, ctx) = sent_invoice(dec!(100));
        let id = invoice.id;
        invoice.applications.push(Application::payment(PaymentId::new(), id, Money::new(dec!(120), Currency::USD), &ctx));

        assert_eq!(balance(&invoice).amount(), dec!(-20.00));
        assert!(is_fully_paid(&invoice));
        assert_eq!(
            update_payment_status(&mut invoice, date(2024, 1, 10)),
            Some(StatusChange { from: InvoiceStatus::Sent, to: InvoiceStatus::Paid })
        );
    }

    #[test]
    fn test_foreign_currency_application_is_skipped() {
        let (mut invoice, ctx) = sent_invoice(dec!(100));
        let id = invoice.id;
        invoice.applications.push(Application::payment(PaymentId::new(), id, Money::new(dec!(30), Currency::EUR), &ctx));

        let summary = summarize(&invoice);
        assert!(summary.total_paid.is_zero());
        assert_eq!(summary.excluded[0].1, Exclusion::CurrencyMismatch);
    }

    #[test]
    fn test_draft_is_never_auto_transitioned() {
        let ctx = OperationContext::new(CompanyId::new(), UserId::new());
        let mut invoice = Invoice::new(ctx.company_id, ClientId::new(), "INV-2", date(2024, 1, 1), date(2024, 1, 2), Currency::USD);
        let id = invoice.id;
        invoice.applications.push(Application::payment(PaymentId::new(), id, Money::new(dec!(10), Currency::USD), &ctx));

        assert_eq!(update_payment_status(&mut invoice, date(2024, 6, 1)), None);
        assert_eq!(sweep_status(&mut invoice, date(2024, 6, 1)), None);
        assert!(!is_overdue(&invoice, date(2024, 6, 1)));
    }

    #[test]
    fn test_sweep_marks_sent_overdue_and_keeps_it() {
        let (mut invoice, _) = sent_invoice(dec!(100));
        let today = date(2024, 2, 1);

        assert_eq!(update_payment_status(&mut invoice, today), None);
        assert_eq!(
            sweep_status(&mut invoice, today),
            Some(StatusChange { from: InvoiceStatus::Sent, to: InvoiceStatus::Overdue })
        );
        assert_eq!(update_payment_status(&mut invoice, today), None);
        assert_eq!(invoice.status, InvoiceStatus::Overdue);
    }

    #[test]
    fn test_not_overdue_on_due_date() {
        let (invoice, _) = sent_invoice(dec!(100));
        assert!(!is_overdue(&invoice, date(2024, 1, 31)));
        assert!(is_overdue(&invoice, date(2024, 2, 1)));
    }
}
