//! Invoice selection criteria
//!
//! Collaborators build an `InvoiceFilter` instead of composing queries;
//! `matches` is the single pure evaluation used both in memory and to
//! double-check rows returned by storage.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClientId, CompanyId};

use crate::invoice::{Invoice, InvoiceStatus};
use crate::ledger;

/// Criteria for selecting invoices
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceFilter {
    /// Empty means any status
    pub statuses: Vec<InvoiceStatus>,
    pub company_id: Option<CompanyId>,
    pub client_id: Option<ClientId>,
    /// Due date strictly before this date
    pub due_before: Option<NaiveDate>,
    /// Balance strictly greater than this amount
    pub balance_above: Option<Decimal>,
}

impl InvoiceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sent invoices past due with something still owed
    pub fn overdue_candidates(today: NaiveDate) -> Self {
        Self {
            statuses: vec![InvoiceStatus::Sent],
            due_before: Some(today),
            balance_above: Some(Decimal::ZERO),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn for_company(mut self, company_id: CompanyId) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn for_client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn due_before(mut self, date: NaiveDate) -> Self {
        self.due_before = Some(date);
        self
    }

    pub fn balance_above(mut self, amount: Decimal) -> Self {
        self.balance_above = Some(amount);
        self
    }

    pub fn matches(&self, invoice: &Invoice) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&invoice.status) {
            return false;
        }
        if self.company_id.is_some_and(|c| c != invoice.company_id) {
            return false;
        }
        if self.client_id.is_some_and(|c| c != invoice.client_id) {
            return false;
        }
        if self.due_before.is_some_and(|d| invoice.due_date >= d) {
            return false;
        }
        // balance is derived, so it is evaluated last
        match self.balance_above {
            Some(min) => ledger::balance(invoice).amount() > min,
            None => true,
        }
    }

    /// Filters a slice of invoices
    pub fn select<'a>(&self, invoices: &'a [Invoice]) -> Vec<&'a Invoice> {
        invoices.iter().filter(|i| self.matches(i)).collect()
    }
}
