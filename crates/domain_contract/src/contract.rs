//! Contract aggregate and lifecycle

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{ClientId, CompanyId, ContractId, Currency, OperationContext, UserId};

use crate::config::BillingConfig;
use crate::error::ContractError;

/// Contract lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Active,
    Suspended,
    Terminated,
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContractStatus::Draft => "draft",
            ContractStatus::Active => "active",
            ContractStatus::Suspended => "suspended",
            ContractStatus::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// A recurring service agreement with a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub company_id: CompanyId,
    pub client_id: ClientId,
    pub name: String,
    pub currency: Currency,
    pub start_date: NaiveDate,
    /// Last covered day; `None` runs until terminated
    pub end_date: Option<NaiveDate>,
    pub status: ContractStatus,
    pub billing: BillingConfig,
    pub activated_at: Option<DateTime<Utc>>,
    pub activated_by: Option<UserId>,
    pub terminated_at: Option<DateTime<Utc>>,
}

impl Contract {
    /// Creates a draft contract
    pub fn new(
        company_id: CompanyId,
        client_id: ClientId,
        name: impl Into<String>,
        currency: Currency,
        start_date: NaiveDate,
        billing: BillingConfig,
    ) -> Self {
        Self {
            id: ContractId::new_v7(),
            company_id,
            client_id,
            name: name.into(),
            currency,
            start_date,
            end_date: None,
            status: ContractStatus::Draft,
            billing,
            activated_at: None,
            activated_by: None,
            terminated_at: None,
        }
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Returns true if the date is inside the contract term
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }

    /// Validates the term and the billing configuration
    pub fn validate(&self) -> Result<(), ContractError> {
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(ContractError::validation(format!(
                    "contract ends on {} before it starts on {}",
                    end, self.start_date
                )));
            }
        }
        self.billing.validate(self.currency)
    }

    /// Pauses billing on an active contract
    pub fn suspend(&mut self) -> Result<(), ContractError> {
        if self.status != ContractStatus::Active {
            return Err(ContractError::InvalidTransition {
                from: self.status,
                action: "suspend",
            });
        }
        self.status = ContractStatus::Suspended;
        Ok(())
    }

    /// Ends the contract; terminating twice is a no-op
    ///
    /// The term is closed at the termination day, or at the start date for a
    /// contract that never began. An earlier end date is kept.
    pub fn terminate(&mut self, ctx: &OperationContext) -> Result<(), ContractError> {
        if self.status == ContractStatus::Terminated {
            return Ok(());
        }
        let last_day = ctx.today().max(self.start_date);
        self.end_date = Some(self.end_date.map_or(last_day, |end| end.min(last_day)));
        self.status = ContractStatus::Terminated;
        self.terminated_at = Some(ctx.now());
        Ok(())
    }

    pub(crate) fn mark_active(&mut self, ctx: &OperationContext) {
        self.status = ContractStatus::Active;
        self.activated_at = Some(ctx.now());
        self.activated_by = Some(ctx.actor_id);
    }
}
