//! Invoice storage port
//!
//! `InvoiceStore` is implemented by the PostgreSQL repository in `infra_db`
//! and by [`InMemoryInvoiceStore`] for tests and previews. Both enforce the
//! same optimistic version check on save.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use core_kernel::InvoiceId;

use crate::error::BillingError;
use crate::filter::InvoiceFilter;
use crate::invoice::Invoice;

/// Loads and saves fully hydrated invoices
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Loads an invoice with its items and applications
    async fn load(&self, id: InvoiceId) -> Result<Invoice, BillingError>;

    /// Persists the invoice if the stored version still equals
    /// `invoice.version`, returning the new version
    ///
    /// A new invoice is saved with version 0.
    async fn save(&self, invoice: &Invoice) -> Result<u64, BillingError>;

    /// Returns invoices matching the filter
    async fn find(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, BillingError>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryInvoiceStore {
    invoices: RwLock<HashMap<InvoiceId, Invoice>>,
}

impl InMemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.invoices.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl InvoiceStore for InMemoryInvoiceStore {
    async fn load(&self, id: InvoiceId) -> Result<Invoice, BillingError> {
        let invoices = self.invoices.read().unwrap_or_else(|e| e.into_inner());
        invoices.get(&id).cloned().ok_or(BillingError::InvoiceNotFound(id))
    }

    async fn save(&self, invoice: &Invoice) -> Result<u64, BillingError> {
        let mut invoices = self.invoices.write().unwrap_or_else(|e| e.into_inner());

        let stored_version = invoices.get(&invoice.id).map(|stored| stored.version);
        match stored_version {
            Some(actual) if actual != invoice.version => {
                return Err(BillingError::VersionConflict {
                    invoice_id: invoice.id,
                    expected: invoice.version,
                    actual,
                });
            }
            None if invoice.version != 0 => return Err(BillingError::InvoiceNotFound(invoice.id)),
            _ => {}
        }

        let mut next = invoice.clone();
        next.version = invoice.version + 1;
        let version = next.version;
        invoices.insert(invoice.id, next);
        Ok(version)
    }

    async fn find(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, BillingError> {
        let invoices = self.invoices.read().unwrap_or_else(|e| e.into_inner());
        let mut found: Vec<Invoice> = invoices.values().filter(|i| filter.matches(i)).cloned().collect();
        found.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}
