//! Payment and credit applications
//!
//! An application allocates part of a payment or a credit to exactly one
//! target. Applications are never deleted; voiding flips `is_active` and
//! records who did it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    ApplicationId, ClientId, CreditId, InvoiceId, Money, OperationContext, PaymentId, UserId,
};

/// What the applied money comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplicationSource {
    Payment { payment_id: PaymentId },
    Credit { credit_id: CreditId },
}

/// What the applied money is allocated to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplicationTarget {
    Invoice { invoice_id: InvoiceId },
    /// Unallocated credit held on the client account
    ClientBalance { client_id: ClientId },
}

/// Hydrated state of the payment or credit behind an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    #[default]
    Active,
    SoftDeleted,
    /// The loader could not find the source record
    Missing,
}

/// An allocation of a payment or credit to a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub source: ApplicationSource,
    pub target: ApplicationTarget,
    pub amount: Money,
    pub is_active: bool,
    pub source_state: SourceState,
    pub applied_at: DateTime<Utc>,
    pub applied_by: UserId,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<UserId>,
}

impl Application {
    /// Creates an active application of a payment to an invoice
    pub fn payment(
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        amount: Money,
        ctx: &OperationContext,
    ) -> Self {
        Self::new(
            ApplicationSource::Payment { payment_id },
            ApplicationTarget::Invoice { invoice_id },
            amount,
            ctx,
        )
    }

    /// Creates an active application of a credit to an invoice
    pub fn credit(
        credit_id: CreditId,
        invoice_id: InvoiceId,
        amount: Money,
        ctx: &OperationContext,
    ) -> Self {
        Self::new(
            ApplicationSource::Credit { credit_id },
            ApplicationTarget::Invoice { invoice_id },
            amount,
            ctx,
        )
    }

    pub fn new(
        source: ApplicationSource,
        target: ApplicationTarget,
        amount: Money,
        ctx: &OperationContext,
    ) -> Self {
        Self {
            id: ApplicationId::new_v7(),
            source,
            target,
            amount,
            is_active: true,
            source_state: SourceState::Active,
            applied_at: ctx.now(),
            applied_by: ctx.actor_id,
            voided_at: None,
            voided_by: None,
        }
    }

    /// Marks the source as soft-deleted
    pub fn with_source_state(mut self, state: SourceState) -> Self {
        self.source_state = state;
        self
    }

    /// Soft-voids the application. Voiding twice keeps the first record.
    pub fn void(&mut self, ctx: &OperationContext) {
        if !self.is_active {
            return;
        }
        self.is_active = false;
        self.voided_at = Some(ctx.now());
        self.voided_by = Some(ctx.actor_id);
    }

    pub fn is_payment(&self) -> bool {
        matches!(self.source, ApplicationSource::Payment { .. })
    }

    /// Whether the application contributes to the paid total of `invoice_id`
    pub fn counts_toward(&self, invoice_id: InvoiceId) -> Result<(), Exclusion> {
        if !self.is_active {
            return Err(Exclusion::Inactive);
        }
        match self.source_state {
            SourceState::Active => {}
            SourceState::SoftDeleted => return Err(Exclusion::SourceDeleted),
            SourceState::Missing => return Err(Exclusion::SourceMissing),
        }
        match self.target {
            ApplicationTarget::Invoice { invoice_id: target } if target == invoice_id => {}
            _ => return Err(Exclusion::ForeignTarget),
        }
        if !self.amount.is_positive() {
            return Err(Exclusion::NonPositiveAmount);
        }
        Ok(())
    }
}

/// Why an application was left out of a paid total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    Inactive,
    SourceDeleted,
    SourceMissing,
    ForeignTarget,
    CurrencyMismatch,
    NonPositiveAmount,
}

impl Exclusion {
    /// Inactive and soft-deleted applications are expected; the rest
    /// indicate bad data
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Exclusion::Inactive | Exclusion::SourceDeleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{CompanyId, Currency};
    use rust_decimal_macros::dec;

    fn ctx() -> OperationContext {
        OperationContext::new(CompanyId::new(), UserId::new())
    }

    #[test]
    fn test_void_records_actor_once() {
        let ctx = ctx();
        let mut app = Application::payment(
            PaymentId::new(),
            InvoiceId::new(),
            Money::new(dec!(50), Currency::USD),
            &ctx,
        );

        app.void(&ctx);
        let first = app.voided_at;
        app.void(&OperationContext::new(CompanyId::new(), UserId::new()));

        assert!(!app.is_active);
        assert_eq!(app.voided_at, first);
        assert_eq!(app.voided_by, Some(ctx.actor_id));
    }

    #[test]
    fn test_exclusion_reasons() {
        let ctx = ctx();
        let invoice_id = InvoiceId::new();
        let app = Application::credit(
            CreditId::new(),
            invoice_id,
            Money::new(dec!(10), Currency::USD),
            &ctx,
        );

        assert_eq!(app.counts_toward(invoice_id), Ok(()));
        assert_eq!(app.counts_toward(InvoiceId::new()), Err(Exclusion::ForeignTarget));
        assert_eq!(
            app.clone().with_source_state(SourceState::SoftDeleted).counts_toward(invoice_id),
            Err(Exclusion::SourceDeleted)
        );
    }

    #[test]
    fn test_source_serializes_with_kind_tag() {
        let payment_id = PaymentId::new();
        let json = serde_json::to_value(ApplicationSource::Payment { payment_id }).unwrap();
        assert_eq!(json["kind"], "payment");
        assert_eq!(json["payment_id"], payment_id.as_uuid().to_string());
    }
}
