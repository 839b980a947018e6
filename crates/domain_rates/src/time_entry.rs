//! Time entry billing
//!
//! Prices worked time against a rate card book and turns the result into
//! invoice lines.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use core_kernel::{ClientId, ErrorKind, Money, RateCardId, TimeEntryId, UserId};
use domain_billing::{InvoiceItem, InvoiceItemType};

use crate::book::RateCardBook;
use crate::error::RateError;
use crate::selection::RateCardCriteria;

/// Time logged by a technician
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: TimeEntryId,
    pub client_id: ClientId,
    pub technician_id: UserId,
    pub service_type: Option<String>,
    pub work_date: NaiveDate,
    pub hours: Decimal,
    pub description: String,
    pub is_billable: bool,
}

impl TimeEntry {
    pub fn new(
        client_id: ClientId,
        technician_id: UserId,
        service_type: Option<String>,
        work_date: NaiveDate,
        hours: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: TimeEntryId::new_v7(),
            client_id,
            technician_id,
            service_type,
            work_date,
            hours,
            description: description.into(),
            is_billable: true,
        }
    }

    fn criteria(&self) -> RateCardCriteria {
        RateCardCriteria::new(self.client_id, self.service_type.clone(), self.work_date)
    }
}

/// A priced time entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BilledTime {
    pub entry_id: TimeEntryId,
    pub rate_card_id: RateCardId,
    pub description: String,
    pub actual_hours: Decimal,
    pub billable_hours: Decimal,
    pub hourly_rate: Money,
    pub amount: Money,
}

impl BilledTime {
    pub fn to_invoice_item(&self) -> InvoiceItem {
        InvoiceItem::new(self.description.clone(), InvoiceItemType::Labor, self.hourly_rate)
            .with_quantity(self.billable_hours)
    }
}

/// Prices a single entry
pub fn bill_time_entry(book: &RateCardBook, entry: &TimeEntry) -> Result<BilledTime, RateError> {
    if !entry.is_billable {
        return Err(RateError::validation(format!("time entry {} is not billable", entry.id)));
    }
    let card = book.select(&entry.criteria())?;
    let billable_hours = card.calculate_billable_hours(entry.hours)?;

    Ok(BilledTime {
        entry_id: entry.id,
        rate_card_id: card.id,
        description: entry.description.clone(),
        actual_hours: entry.hours,
        billable_hours,
        hourly_rate: card.hourly_rate,
        amount: card.hourly_rate.extend(billable_hours),
    })
}

/// An entry that could not be priced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbilledTime {
    pub entry_id: TimeEntryId,
    pub kind: ErrorKind,
    pub message: String,
}

/// Result of pricing a batch of entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeBillingRun {
    pub billed: Vec<BilledTime>,
    pub unbilled: Vec<UnbilledTime>,
}

impl TimeBillingRun {
    pub fn invoice_items(&self) -> Vec<InvoiceItem> {
        self.billed.iter().map(BilledTime::to_invoice_item).collect()
    }
}

/// Prices every billable entry; non-billable entries are skipped silently
/// and failures are collected
pub fn bill_time_entries(book: &RateCardBook, entries: &[TimeEntry]) -> TimeBillingRun {
    let mut run = TimeBillingRun::default();

    for entry in entries.iter().filter(|e| e.is_billable) {
        match bill_time_entry(book, entry) {
            Ok(billed) => run.billed.push(billed),
            Err(e) => {
                warn!(time_entry_id = %entry.id, error = %e, "Time entry not billed");
                run.unbilled.push(UnbilledTime {
                    entry_id: entry.id,
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
    }

    info!(billed = run.billed.len(), unbilled = run.unbilled.len(), "Time billing complete");
    run
}
