//! Bank reconciliation
//!
//! Links bank transactions to the payments or expenses they settle. The
//! target is a hydrated snapshot carrying whatever the checks need, so the
//! functions here stay free of storage access.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use core_kernel::{
    BankTransactionId, CompanyId, ErrorKind, ExpenseId, InvoiceId, Money, OperationContext,
    PaymentId, UserId,
};

use crate::error::BillingError;
use crate::invoice::InvoiceStatus;

/// What a bank transaction settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconciliationTarget {
    Payment { payment_id: PaymentId },
    Expense { expense_id: ExpenseId },
}

/// A link between a bank transaction and its target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub target: ReconciliationTarget,
    pub reconciled_by: UserId,
    pub reconciled_at: DateTime<Utc>,
}

/// A line from an imported bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: BankTransactionId,
    pub company_id: CompanyId,
    /// Deposits are positive, withdrawals negative
    pub amount: Money,
    pub posted_date: NaiveDate,
    pub description: String,
    pub reconciliation: Option<Reconciliation>,
    pub unreconciled_by: Option<UserId>,
    pub unreconciled_at: Option<DateTime<Utc>>,
}

impl BankTransaction {
    pub fn new(
        company_id: CompanyId,
        amount: Money,
        posted_date: NaiveDate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: BankTransactionId::new_v7(),
            company_id,
            amount,
            posted_date,
            description: description.into(),
            reconciliation: None,
            unreconciled_by: None,
            unreconciled_at: None,
        }
    }

    pub fn is_reconciled(&self) -> bool {
        self.reconciliation.is_some()
    }
}

/// Everything reconciliation needs to know about a payment or expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub target: ReconciliationTarget,
    pub company_id: CompanyId,
    pub amount: Money,
    pub date: NaiveDate,
    /// Invoice a payment was applied to, if any
    pub invoice: Option<(InvoiceId, InvoiceStatus)>,
}

impl TargetSnapshot {
    pub fn payment(payment_id: PaymentId, company_id: CompanyId, amount: Money, date: NaiveDate) -> Self {
        Self {
            target: ReconciliationTarget::Payment { payment_id },
            company_id,
            amount,
            date,
            invoice: None,
        }
    }

    pub fn expense(expense_id: ExpenseId, company_id: CompanyId, amount: Money, date: NaiveDate) -> Self {
        Self {
            target: ReconciliationTarget::Expense { expense_id },
            company_id,
            amount,
            date,
            invoice: None,
        }
    }

    pub fn with_invoice(mut self, invoice_id: InvoiceId, status: InvoiceStatus) -> Self {
        self.invoice = Some((invoice_id, status));
        self
    }

    fn cancelled_invoice(&self) -> Option<InvoiceId> {
        match self.invoice {
            Some((id, InvoiceStatus::Cancelled)) => Some(id),
            _ => None,
        }
    }
}

/// Result of a reconcile or unreconcile call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Linked,
    Unlinked,
    /// The transaction was already in the requested state
    Unchanged,
}

/// Links a bank transaction to a payment or expense
///
/// # Errors
///
/// - `CompanyMismatch` when either record belongs to another company
/// - `AlreadyReconciled` when linked to a different target
/// - `CancelledInvoice` when the payment was applied to a cancelled invoice
pub fn reconcile(
    transaction: &mut BankTransaction,
    target: &TargetSnapshot,
    ctx: &OperationContext,
) -> Result<ReconcileOutcome, BillingError> {
    ensure_company(transaction.company_id, ctx, "bank transaction")?;
    ensure_company(target.company_id, ctx, "reconciliation target")?;

    if let Some(existing) = &transaction.reconciliation {
        if existing.target == target.target {
            return Ok(ReconcileOutcome::Unchanged);
        }
        return Err(BillingError::AlreadyReconciled(transaction.id));
    }

    if let Some(invoice_id) = target.cancelled_invoice() {
        return Err(BillingError::CancelledInvoice(invoice_id));
    }

    transaction.reconciliation = Some(Reconciliation {
        target: target.target,
        reconciled_by: ctx.actor_id,
        reconciled_at: ctx.now(),
    });
    debug!(transaction_id = %transaction.id, target = ?target.target, "Bank transaction reconciled");
    Ok(ReconcileOutcome::Linked)
}

/// Removes the link from a bank transaction
pub fn unreconcile(
    transaction: &mut BankTransaction,
    ctx: &OperationContext,
) -> Result<ReconcileOutcome, BillingError> {
    ensure_company(transaction.company_id, ctx, "bank transaction")?;

    if transaction.reconciliation.take().is_none() {
        return Ok(ReconcileOutcome::Unchanged);
    }
    transaction.unreconciled_by = Some(ctx.actor_id);
    transaction.unreconciled_at = Some(ctx.now());
    debug!(transaction_id = %transaction.id, "Bank transaction unreconciled");
    Ok(ReconcileOutcome::Unlinked)
}

fn ensure_company(
    company_id: CompanyId,
    ctx: &OperationContext,
    what: &str,
) -> Result<(), BillingError> {
    if company_id != ctx.company_id {
        return Err(BillingError::CompanyMismatch(format!("{} belongs to {}", what, company_id)));
    }
    Ok(())
}

/// A failed item in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub transaction_id: BankTransactionId,
    pub kind: ErrorKind,
    pub message: String,
}

/// Per-item results of a reconciliation batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub linked: Vec<BankTransactionId>,
    pub unchanged: Vec<BankTransactionId>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Reconciles each pair independently; a failure never stops the batch
pub fn reconcile_batch<'a, I>(items: I, ctx: &OperationContext) -> BatchReport
where
    I: IntoIterator<Item = (&'a mut BankTransaction, &'a TargetSnapshot)>,
{
    let mut report = BatchReport::default();

    for (transaction, target) in items {
        match reconcile(transaction, target, ctx) {
            Ok(ReconcileOutcome::Linked) => report.linked.push(transaction.id),
            Ok(_) => report.unchanged.push(transaction.id),
            Err(e) => {
                warn!(transaction_id = %transaction.id, error = %e, "Reconciliation failed");
                report.failed.push(BatchFailure {
                    transaction_id: transaction.id,
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }

    info!(
        linked = report.linked.len(),
        unchanged = report.unchanged.len(),
        failed = report.failed.len(),
        "Reconciliation batch complete"
    );
    report
}

/// How candidates are ranked for a bank transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCriteria {
    /// Maximum days between posting date and target date
    pub date_window_days: u32,
    /// Accepted absolute difference between amounts
    pub amount_tolerance: Decimal,
    pub max_results: usize,
}

impl Default for MatchCriteria {
    fn default() -> Self {
        Self {
            date_window_days: 7,
            amount_tolerance: Decimal::ZERO,
            max_results: 5,
        }
    }
}

impl MatchCriteria {
    /// Returns the ranking key for a candidate, or `None` if it is out of range
    fn evaluate(&self, transaction: &BankTransaction, candidate: &TargetSnapshot) -> Option<MatchSuggestion> {
        if candidate.company_id != transaction.company_id
            || candidate.amount.currency() != transaction.amount.currency()
            || candidate.cancelled_invoice().is_some()
        {
            return None;
        }

        let difference = (transaction.amount.amount().abs() - candidate.amount.amount().abs()).abs();
        let days_apart = transaction
            .posted_date
            .signed_duration_since(candidate.date)
            .num_days()
            .unsigned_abs();
        if difference > self.amount_tolerance || days_apart > u64::from(self.date_window_days) {
            return None;
        }

        Some(MatchSuggestion {
            target: candidate.target,
            amount_difference: difference,
            days_apart,
        })
    }
}

/// A ranked reconciliation candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSuggestion {
    pub target: ReconciliationTarget,
    pub amount_difference: Decimal,
    pub days_apart: u64,
}

impl MatchSuggestion {
    pub fn is_exact_amount(&self) -> bool {
        self.amount_difference.is_zero()
    }
}

/// Ranks candidates by amount difference, then date proximity
///
/// Ties keep the order the candidates were supplied in.
pub fn suggest_matches(
    transaction: &BankTransaction,
    candidates: &[TargetSnapshot],
    criteria: &MatchCriteria,
) -> Vec<MatchSuggestion> {
    if transaction.is_reconciled() {
        return Vec::new();
    }

    let mut suggestions: Vec<MatchSuggestion> = candidates
        .iter()
        .filter_map(|c| criteria.evaluate(transaction, c))
        .collect();
    suggestions.sort_by(|a, b| {
        a.amount_difference
            .cmp(&b.amount_difference)
            .then(a.days_apart.cmp(&b.days_apart))
    });
    suggestions.truncate(criteria.max_results);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn usd(amount: Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    #[test]
    fn test_reconcile_twice_to_same_target_is_noop() {
        let ctx = OperationContext::new(CompanyId::new(), UserId::new());
        let mut tx = BankTransaction::new(ctx.company_id, usd(dec!(250)), date(3), "ACH DEPOSIT");
        let target = TargetSnapshot::payment(PaymentId::new(), ctx.company_id, usd(dec!(250)), date(2));

        assert_eq!(reconcile(&mut tx, &target, &ctx).unwrap(), ReconcileOutcome::Linked);
        let first = tx.reconciliation.clone();
        assert_eq!(reconcile(&mut tx, &target, &ctx).unwrap(), ReconcileOutcome::Unchanged);
        assert_eq!(tx.reconciliation, first);
    }

    #[test]
    fn test_unreconcile_unlinked_is_noop() {
        let ctx = OperationContext::new(CompanyId::new(), UserId::new());
        let mut tx = BankTransaction::new(ctx.company_id, usd(dec!(10)), date(3), "FEE");
        assert_eq!(unreconcile(&mut tx, &ctx).unwrap(), ReconcileOutcome::Unchanged);
        assert!(tx.unreconciled_by.is_none());
    }

    #[test]
    fn test_suggestions_prefer_exact_amount_then_nearest_date() {
        let company = CompanyId::new();
        let tx = BankTransaction::new(company, usd(dec!(100)), date(10), "DEPOSIT");
        let far_exact = TargetSnapshot::payment(PaymentId::new(), company, usd(dec!(100)), date(4));
        let near_exact = TargetSnapshot::payment(PaymentId::new(), company, usd(dec!(100)), date(9));
        let near_off = TargetSnapshot::payment(PaymentId::new(), company, usd(dec!(99)), date(10));
        let criteria = MatchCriteria {
            amount_tolerance: dec!(2),
            ..MatchCriteria::default()
        };

        let ranked = suggest_matches(&tx, &[far_exact.clone(), near_off.clone(), near_exact.clone()], &criteria);

        let order: Vec<_> = ranked.iter().map(|s| s.target).collect();
        assert_eq!(order, vec![near_exact.target, far_exact.target, near_off.target]);
        assert!(ranked[0].is_exact_amount());
    }
}
