//! Billable expenses
//!
//! Markup can be given either as a percentage of the expense or as a fixed
//! amount; setting one derives the other.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{round_half_up, ClientId, CompanyId, ExpenseId, Money};

use crate::error::BillingError;
use crate::invoice::{InvoiceItem, InvoiceItemType};

/// An expense incurred by the company, possibly re-billed to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub company_id: CompanyId,
    pub client_id: Option<ClientId>,
    pub description: String,
    pub amount: Money,
    pub expense_date: NaiveDate,
    pub is_billable: bool,
    pub markup_percentage: Option<Decimal>,
    pub markup_amount: Option<Money>,
}

impl Expense {
    pub fn new(
        company_id: CompanyId,
        description: impl Into<String>,
        amount: Money,
        expense_date: NaiveDate,
    ) -> Self {
        Self {
            id: ExpenseId::new_v7(),
            company_id,
            client_id: None,
            description: description.into(),
            amount,
            expense_date,
            is_billable: false,
            markup_percentage: None,
            markup_amount: None,
        }
    }

    /// Marks the expense billable to a client
    pub fn bill_to(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self.is_billable = true;
        self
    }

    /// Sets markup as a percentage and derives the amount
    pub fn set_markup_percentage(&mut self, percentage: Decimal) -> Result<(), BillingError> {
        if percentage.is_sign_negative() {
            return Err(BillingError::validation("markup percentage cannot be negative"));
        }
        self.markup_percentage = Some(percentage);
        self.markup_amount = Some(self.amount.extend(percentage / dec!(100)));
        Ok(())
    }

    /// Sets markup as an amount and derives the percentage
    pub fn set_markup_amount(&mut self, markup: Money) -> Result<(), BillingError> {
        if markup.is_negative() {
            return Err(BillingError::validation("markup amount cannot be negative"));
        }
        if markup.currency() != self.amount.currency() {
            return Err(BillingError::validation("markup currency must match the expense"));
        }
        let percentage = if self.amount.is_zero() {
            Decimal::ZERO
        } else {
            round_half_up(markup.amount() / self.amount.amount() * dec!(100), 2)
        };
        self.markup_amount = Some(markup.round_to_currency());
        self.markup_percentage = Some(percentage);
        Ok(())
    }

    /// `amount + markup` when billable, zero otherwise
    pub fn total_billable_amount(&self) -> Money {
        let currency = self.amount.currency();
        if !self.is_billable {
            return Money::zero(currency);
        }
        let markup = self.markup_amount.map(|m| m.amount()).unwrap_or_default();
        Money::new(self.amount.amount() + markup, currency).round_to_currency()
    }

    /// Converts a billable expense into an invoice line
    pub fn to_invoice_item(&self) -> Result<InvoiceItem, BillingError> {
        if !self.is_billable {
            return Err(BillingError::validation(format!("expense {} is not billable", self.id)));
        }
        Ok(InvoiceItem::new(
            self.description.clone(),
            InvoiceItemType::Expense,
            self.total_billable_amount(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    fn expense(amount: Decimal) -> Expense {
        Expense::new(
            CompanyId::new(),
            "Replacement SSD",
            Money::new(amount, Currency::USD),
            NaiveDate::from_ymd_opt(2024, 2, 14).unwrap(),
        )
        .bill_to(ClientId::new())
    }

    #[test]
    fn test_percentage_derives_amount() {
        let mut e = expense(dec!(80));
        e.set_markup_percentage(dec!(15)).unwrap();
        assert_eq!(e.markup_amount.unwrap().amount(), dec!(12.00));
        assert_eq!(e.total_billable_amount().amount(), dec!(92.00));
    }

    #[test]
    fn test_amount_derives_percentage() {
        let mut e = expense(dec!(80));
        e.set_markup_amount(Money::new(dec!(20), Currency::USD)).unwrap();
        assert_eq!(e.markup_percentage, Some(dec!(25.00)));
    }

    #[test]
    fn test_non_billable_total_is_zero() {
        let mut e = expense(dec!(80));
        e.is_billable = false;
        assert!(e.total_billable_amount().is_zero());
        assert!(e.to_invoice_item().is_err());
    }

    #[test]
    fn test_negative_markup_rejected() {
        let mut e = expense(dec!(80));
        assert!(e.set_markup_percentage(dec!(-1)).is_err());
    }
}
