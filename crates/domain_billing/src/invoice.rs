//! Invoice management
//!
//! An `Invoice` is the fully hydrated aggregate the ledger engine works on:
//! header, line items, and every payment or credit application linked to it.
//! Collaborators load it completely before handing it to the engine.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    ClientId, CompanyId, Currency, InvoiceId, InvoiceItemId, Money, OperationContext, UserId,
};

use crate::application::Application;
use crate::error::BillingError;

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Invoice is being drafted
    Draft,
    /// Invoice has been sent to the client
    Sent,
    /// Partial payment received
    Partial,
    /// Fully paid (or overpaid)
    Paid,
    /// Past due date with an outstanding balance
    Overdue,
    /// Voided
    Cancelled,
}

impl InvoiceStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Draft and Cancelled invoices only move through explicit actions
    pub fn is_auto_transitionable(&self) -> bool {
        !matches!(self, InvoiceStatus::Draft | InvoiceStatus::Cancelled)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "partial" => Ok(InvoiceStatus::Partial),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(BillingError::validation(format!("unknown invoice status '{}'", other))),
        }
    }
}

/// An invoice issued to a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Owning company
    pub company_id: CompanyId,
    /// Client being billed
    pub client_id: ClientId,
    /// Invoice number (human-readable)
    pub invoice_number: String,
    /// Issue date
    pub issue_date: NaiveDate,
    /// Due date
    pub due_date: NaiveDate,
    /// Currency
    pub currency: Currency,
    /// Line items
    pub items: Vec<InvoiceItem>,
    /// Sum of line items
    pub subtotal: Money,
    /// Tax amount
    pub tax: Option<Money>,
    /// Total amount due
    pub amount: Money,
    /// Status
    pub status: InvoiceStatus,
    /// Payment and credit applications targeting this invoice
    pub applications: Vec<Application>,
    /// Optimistic concurrency version
    pub version: u64,
    /// When the invoice was sent
    pub sent_at: Option<DateTime<Utc>>,
    /// When and by whom it was voided
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
    /// Notes
    pub notes: Option<String>,
}

impl Invoice {
    /// Creates a new draft invoice
    ///
    /// # Arguments
    ///
    /// * `company_id` - Owning company
    /// * `client_id` - Client being billed
    /// * `invoice_number` - Number assigned by the numbering collaborator
    /// * `issue_date` - Date of issue
    /// * `due_date` - Payment due date
    /// * `currency` - Invoice currency
    pub fn new(
        company_id: CompanyId,
        client_id: ClientId,
        invoice_number: impl Into<String>,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        currency: Currency,
    ) -> Self {
        Self {
            id: InvoiceId::new_v7(),
            company_id,
            client_id,
            invoice_number: invoice_number.into(),
            issue_date,
            due_date,
            currency,
            items: Vec::new(),
            subtotal: Money::zero(currency),
            tax: None,
            amount: Money::zero(currency),
            status: InvoiceStatus::Draft,
            applications: Vec::new(),
            version: 0,
            sent_at: None,
            cancelled_at: None,
            cancelled_by: None,
            notes: None,
        }
    }

    /// Adds an item to a draft invoice
    ///
    /// # Errors
    ///
    /// Returns error if the invoice is no longer a draft or the item
    /// currency differs from the invoice currency
    pub fn add_item(&mut self, item: InvoiceItem) -> Result<(), BillingError> {
        self.ensure_draft("edit")?;
        if item.unit_price.currency() != self.currency {
            return Err(BillingError::validation(format!(
                "item currency {} does not match invoice currency {}",
                item.unit_price.currency(),
                self.currency
            )));
        }
        self.items.push(item);
        self.recalculate_totals()
    }

    /// Sets the tax amount on a draft invoice
    pub fn set_tax(&mut self, tax: Money) -> Result<(), BillingError> {
        self.ensure_draft("edit")?;
        self.tax = Some(tax);
        self.recalculate_totals()
    }

    /// Sends a draft invoice
    pub fn send(&mut self, ctx: &OperationContext) -> Result<(), BillingError> {
        self.ensure_draft("send")?;
        self.status = InvoiceStatus::Sent;
        self.sent_at = Some(ctx.now());
        Ok(())
    }

    /// Voids the invoice
    ///
    /// Voiding an already cancelled invoice is a no-op. An invoice that is
    /// settled by active applications cannot be voided until they are voided.
    pub fn void(&mut self, ctx: &OperationContext) -> Result<(), BillingError> {
        if self.status == InvoiceStatus::Cancelled {
            return Ok(());
        }
        if self.status == InvoiceStatus::Paid && crate::ledger::total_paid(self).is_positive() {
            return Err(BillingError::InvalidTransition {
                from: self.status,
                action: "void",
            });
        }
        self.status = InvoiceStatus::Cancelled;
        self.cancelled_at = Some(ctx.now());
        self.cancelled_by = Some(ctx.actor_id);
        Ok(())
    }

    /// Finds an application by id
    pub fn application_mut(
        &mut self,
        id: core_kernel::ApplicationId,
    ) -> Result<&mut Application, BillingError> {
        let invoice_id = self.id;
        self.applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(BillingError::ApplicationNotFound {
                invoice_id,
                application_id: id,
            })
    }

    fn ensure_draft(&self, action: &'static str) -> Result<(), BillingError> {
        if self.status != InvoiceStatus::Draft {
            return Err(BillingError::InvalidTransition {
                from: self.status,
                action,
            });
        }
        Ok(())
    }

    /// Recalculates totals based on items
    fn recalculate_totals(&mut self) -> Result<(), BillingError> {
        let line_totals: Vec<Money> = self.items.iter().map(InvoiceItem::total).collect();
        self.subtotal = Money::try_sum(self.currency, &line_totals)?.round_to_currency();

        self.amount = match &self.tax {
            Some(tax) => self.subtotal.checked_add(tax)?.round_to_currency(),
            None => self.subtotal,
        };
        Ok(())
    }
}

/// A line item on an invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    /// Item ID
    pub id: InvoiceItemId,
    /// Description
    pub description: String,
    /// Item type
    pub item_type: InvoiceItemType,
    /// Quantity (hours, seats, units)
    pub quantity: Decimal,
    /// Unit price
    pub unit_price: Money,
    /// Discount (if any)
    pub discount: Option<Money>,
}

impl InvoiceItem {
    /// Creates a new invoice item with quantity one
    pub fn new(description: impl Into<String>, item_type: InvoiceItemType, unit_price: Money) -> Self {
        Self {
            id: InvoiceItemId::new_v7(),
            description: description.into(),
            item_type,
            quantity: Decimal::ONE,
            unit_price,
            discount: None,
        }
    }

    /// Sets the quantity
    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    /// Applies a discount
    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = Some(discount);
        self
    }

    /// Line total, rounded to the currency scale
    pub fn total(&self) -> Money {
        let gross = self.unit_price.extend(self.quantity);
        match &self.discount {
            Some(d) => Money::new(gross.amount() - d.amount(), gross.currency()).round_to_currency(),
            None => gross,
        }
    }
}

/// Types of invoice items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceItemType {
    /// Billable time
    Labor,
    /// Recurring contract charge
    Recurring,
    /// One-time setup fee
    SetupFee,
    /// Re-billed expense
    Expense,
    /// Product or hardware
    Product,
    /// Other charge
    Other,
}
