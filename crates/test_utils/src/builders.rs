//! Test Data Builders
//!
//! Builders construct test data with sensible defaults so tests only spell
//! out the fields they care about. Free-text fields are filled with `fake`
//! data.

use chrono::NaiveDate;
use core_kernel::{
    ClientId, CompanyId, Currency, EffectivePeriod, Money, OperationContext, UserId,
};
use domain_billing::{BankTransaction, Invoice, InvoiceItem, InvoiceItemType};
use domain_contract::{AssetSnapshot, BillingConfig, ClientSnapshot, ContactSnapshot, Contract};
use domain_rates::{RateCard, RoundingMethod, TimeEntry};
use fake::faker::company::en::{Bs, CompanyName};
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::fixtures::{IdFixtures, MoneyFixtures, TemporalFixtures};

fn sentence() -> String {
    Sentence(2..6).fake()
}

/// Builder for invoices
pub struct InvoiceBuilder {
    company_id: CompanyId,
    client_id: ClientId,
    invoice_number: String,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    currency: Currency,
    items: Vec<InvoiceItem>,
    sent: bool,
}

impl Default for InvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceBuilder {
    /// A draft USD invoice for the fixture company and client with no items
    pub fn new() -> Self {
        Self {
            company_id: IdFixtures::company_id(),
            client_id: IdFixtures::client_id(),
            invoice_number: format!("INV-{:05}", (1u32..100_000).fake::<u32>()),
            issue_date: TemporalFixtures::issue_date(),
            due_date: TemporalFixtures::due_date(),
            currency: Currency::USD,
            items: Vec::new(),
            sent: false,
        }
    }

    pub fn for_company(mut self, company_id: CompanyId) -> Self {
        self.company_id = company_id;
        self
    }

    pub fn for_client(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.invoice_number = number.into();
        self
    }

    pub fn with_dates(mut self, issue_date: NaiveDate, due_date: NaiveDate) -> Self {
        self.issue_date = issue_date;
        self.due_date = due_date;
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Adds a line priced in the invoice currency
    pub fn with_line(mut self, quantity: Decimal, unit_price: Decimal) -> Self {
        self.items.push(
            InvoiceItem::new(sentence(), InvoiceItemType::Labor, Money::new(unit_price, self.currency))
                .with_quantity(quantity),
        );
        self
    }

    /// Adds the standard monthly support line
    pub fn with_support_line(mut self) -> Self {
        self.items.push(InvoiceItem::new(
            "Managed services",
            InvoiceItemType::Recurring,
            MoneyFixtures::usd_support_fee(),
        ));
        self
    }

    pub fn with_items(mut self, items: impl IntoIterator<Item = InvoiceItem>) -> Self {
        self.items.extend(items);
        self
    }

    /// Sends the invoice after building
    pub fn sent(mut self) -> Self {
        self.sent = true;
        self
    }

    /// Builds the invoice
    ///
    /// # Panics
    ///
    /// Panics if an item's currency differs from the invoice currency.
    pub fn build(self, ctx: &OperationContext) -> Invoice {
        let mut invoice = Invoice::new(
            self.company_id,
            self.client_id,
            self.invoice_number,
            self.issue_date,
            self.due_date,
            self.currency,
        );
        for item in self.items {
            invoice.add_item(item).expect("item currency must match the invoice");
        }
        if self.sent {
            invoice.send(ctx).expect("a new invoice is a draft");
        }
        invoice
    }
}

/// Builder for rate cards
pub struct RateCardBuilder {
    company_id: CompanyId,
    client_id: ClientId,
    name: String,
    service_type: Option<String>,
    hourly_rate: Money,
    effective: EffectivePeriod,
    minimum_hours: Option<Decimal>,
    rounding: Option<(u32, RoundingMethod)>,
    is_default: bool,
}

impl Default for RateCardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RateCardBuilder {
    /// A helpdesk card at the standard hourly rate, effective from the
    /// standard issue date
    pub fn new() -> Self {
        Self {
            company_id: IdFixtures::company_id(),
            client_id: IdFixtures::client_id(),
            name: format!("{} rates", CompanyName().fake::<String>()),
            service_type: Some("helpdesk".to_string()),
            hourly_rate: MoneyFixtures::usd_hourly_rate(),
            effective: TemporalFixtures::from_issue_date(),
            minimum_hours: None,
            rounding: None,
            is_default: false,
        }
    }

    pub fn for_client(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn for_service(mut self, service_type: impl Into<String>) -> Self {
        self.service_type = Some(service_type.into());
        self
    }

    /// Makes the card apply to every service type
    pub fn for_all_services(mut self) -> Self {
        self.service_type = None;
        self
    }

    pub fn with_rate(mut self, amount: Decimal) -> Self {
        self.hourly_rate = Money::new(amount, self.hourly_rate.currency());
        self
    }

    pub fn effective(mut self, from: NaiveDate, to: Option<NaiveDate>) -> Self {
        self.effective = EffectivePeriod::new(from, to).expect("window must not be inverted");
        self
    }

    pub fn with_minimum_hours(mut self, hours: Decimal) -> Self {
        self.minimum_hours = Some(hours);
        self
    }

    pub fn with_rounding(mut self, increment_minutes: u32, method: RoundingMethod) -> Self {
        self.rounding = Some((increment_minutes, method));
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn build(self) -> RateCard {
        let mut card = RateCard::new(
            self.company_id,
            self.client_id,
            self.name,
            self.service_type.clone().unwrap_or_default(),
            self.hourly_rate,
            self.effective,
        );
        if self.service_type.is_none() {
            card = card.for_all_services();
        }
        if let Some(hours) = self.minimum_hours {
            card = card.with_minimum_hours(hours);
        }
        if let Some((increment, method)) = self.rounding {
            card = card.with_rounding(increment, method);
        }
        if self.is_default {
            card = card.as_default();
        }
        card
    }
}

/// Builder for time entries
pub struct TimeEntryBuilder {
    client_id: ClientId,
    technician_id: UserId,
    service_type: Option<String>,
    work_date: NaiveDate,
    hours: Decimal,
    is_billable: bool,
}

impl Default for TimeEntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeEntryBuilder {
    /// One billable helpdesk hour on the standard work date
    pub fn new() -> Self {
        Self {
            client_id: IdFixtures::client_id(),
            technician_id: IdFixtures::user_id(),
            service_type: Some("helpdesk".to_string()),
            work_date: TemporalFixtures::work_date(),
            hours: dec!(1),
            is_billable: true,
        }
    }

    pub fn for_client(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn for_service(mut self, service_type: Option<&str>) -> Self {
        self.service_type = service_type.map(str::to_string);
        self
    }

    pub fn on(mut self, work_date: NaiveDate) -> Self {
        self.work_date = work_date;
        self
    }

    pub fn hours(mut self, hours: Decimal) -> Self {
        self.hours = hours;
        self
    }

    pub fn non_billable(mut self) -> Self {
        self.is_billable = false;
        self
    }

    pub fn build(self) -> TimeEntry {
        let mut entry = TimeEntry::new(
            self.client_id,
            self.technician_id,
            self.service_type,
            self.work_date,
            self.hours,
            sentence(),
        );
        entry.is_billable = self.is_billable;
        entry
    }
}

/// Builder for contracts
pub struct ContractBuilder {
    company_id: CompanyId,
    client_id: ClientId,
    name: String,
    currency: Currency,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    billing: BillingConfig,
}

impl Default for ContractBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractBuilder {
    /// A draft fixed-fee USD contract starting on the standard issue date
    pub fn new() -> Self {
        Self {
            company_id: IdFixtures::company_id(),
            client_id: IdFixtures::client_id(),
            name: format!("{} agreement", Bs().fake::<String>()),
            currency: Currency::USD,
            start_date: TemporalFixtures::issue_date(),
            end_date: None,
            billing: BillingConfig::fixed("Managed services", MoneyFixtures::usd_support_fee()),
        }
    }

    pub fn for_client(mut self, client_id: ClientId) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_billing(mut self, billing: BillingConfig) -> Self {
        self.billing = billing;
        self
    }

    pub fn starting(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self
    }

    pub fn ending(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn build(self) -> Contract {
        let contract = Contract::new(
            self.company_id,
            self.client_id,
            self.name,
            self.currency,
            self.start_date,
            self.billing,
        );
        match self.end_date {
            Some(end) => contract.with_end_date(end),
            None => contract,
        }
    }
}

/// Builder for a client's asset and contact snapshot
pub struct ClientSnapshotBuilder {
    snapshot: ClientSnapshot,
}

impl Default for ClientSnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSnapshotBuilder {
    pub fn new() -> Self {
        Self {
            snapshot: ClientSnapshot::new(IdFixtures::client_id()),
        }
    }

    pub fn for_client(mut self, client_id: ClientId) -> Self {
        self.snapshot.client_id = client_id;
        self
    }

    /// Adds `count` existing assets of a type
    pub fn with_assets(mut self, asset_type: &str, count: usize) -> Self {
        self.snapshot.assets.extend((0..count).map(|_| AssetSnapshot::new(asset_type)));
        self
    }

    /// Adds `count` assets of a type attached since the last cycle
    pub fn with_new_assets(mut self, asset_type: &str, count: usize) -> Self {
        self.snapshot
            .assets
            .extend((0..count).map(|_| AssetSnapshot::new(asset_type).newly_attached()));
        self
    }

    /// Adds `count` contacts with a tier name and fake names
    pub fn with_contacts(mut self, tier: Option<&str>, count: usize) -> Self {
        self.snapshot
            .contacts
            .extend((0..count).map(|_| ContactSnapshot::new(Name().fake::<String>(), tier)));
        self
    }

    pub fn build(self) -> ClientSnapshot {
        self.snapshot
    }
}

/// Builder for imported bank transactions
pub struct BankTransactionBuilder {
    company_id: CompanyId,
    amount: Money,
    posted_date: NaiveDate,
}

impl Default for BankTransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BankTransactionBuilder {
    /// A deposit of the standard support fee on the due date
    pub fn new() -> Self {
        Self {
            company_id: IdFixtures::company_id(),
            amount: MoneyFixtures::usd_support_fee(),
            posted_date: TemporalFixtures::due_date(),
        }
    }

    pub fn for_company(mut self, company_id: CompanyId) -> Self {
        self.company_id = company_id;
        self
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn posted(mut self, date: NaiveDate) -> Self {
        self.posted_date = date;
        self
    }

    pub fn build(self) -> BankTransaction {
        BankTransaction::new(
            self.company_id,
            self.amount,
            self.posted_date,
            format!("DEPOSIT {}", CompanyName().fake::<String>().to_uppercase()),
        )
    }
}
