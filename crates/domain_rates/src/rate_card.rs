//! Rate cards and billable-hour calculation
//!
//! A rate card prices labor for one client, either for a single service type
//! or for all services. Billable hours are derived from worked hours in three
//! steps:
//!
//! 1. Clamp up to `minimum_hours`
//! 2. Snap to the rounding increment (in minutes) using the rounding method
//! 3. Round to 2 decimal places, half away from zero

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{round_half_up, ClientId, CompanyId, EffectivePeriod, Money, RateCardId};

use crate::error::RateError;

/// How worked time is snapped to the rounding increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMethod {
    /// Ceiling to the next multiple
    Up,
    /// Floor to the previous multiple
    Down,
    /// Nearest multiple, halves round up
    Nearest,
    /// Pass worked time through unchanged
    #[default]
    None,
}

impl RoundingMethod {
    fn snap(&self, units: Decimal) -> Decimal {
        match self {
            RoundingMethod::Up => units.ceil(),
            RoundingMethod::Down => units.floor(),
            RoundingMethod::Nearest => round_half_up(units, 0),
            RoundingMethod::None => units,
        }
    }
}

/// Hourly pricing for a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateCard {
    pub id: RateCardId,
    pub company_id: CompanyId,
    pub client_id: ClientId,
    pub name: String,
    /// Service type this card prices; ignored when `applies_to_all_services`
    pub service_type: Option<String>,
    pub applies_to_all_services: bool,
    pub hourly_rate: Money,
    pub effective: EffectivePeriod,
    pub minimum_hours: Option<Decimal>,
    /// Rounding increment in minutes
    pub rounding_increment: Option<u32>,
    pub rounding_method: RoundingMethod,
    pub is_default: bool,
    pub is_active: bool,
}

impl RateCard {
    /// Creates an active, non-default card for one service type with no
    /// minimum and no rounding
    pub fn new(
        company_id: CompanyId,
        client_id: ClientId,
        name: impl Into<String>,
        service_type: impl Into<String>,
        hourly_rate: Money,
        effective: EffectivePeriod,
    ) -> Self {
        Self {
            id: RateCardId::new_v7(),
            company_id,
            client_id,
            name: name.into(),
            service_type: Some(service_type.into()),
            applies_to_all_services: false,
            hourly_rate,
            effective,
            minimum_hours: None,
            rounding_increment: None,
            rounding_method: RoundingMethod::None,
            is_default: false,
            is_active: true,
        }
    }

    /// Makes the card apply to every service type
    pub fn for_all_services(mut self) -> Self {
        self.applies_to_all_services = true;
        self.service_type = None;
        self
    }

    pub fn with_minimum_hours(mut self, hours: Decimal) -> Self {
        self.minimum_hours = Some(hours);
        self
    }

    pub fn with_rounding(mut self, increment_minutes: u32, method: RoundingMethod) -> Self {
        self.rounding_increment = Some(increment_minutes);
        self.rounding_method = method;
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Checks the card before it is stored
    pub fn validate(&self) -> Result<(), RateError> {
        if self.hourly_rate.is_negative() {
            return Err(RateError::validation("hourly rate cannot be negative"));
        }
        if self.minimum_hours.is_some_and(|m| m.is_sign_negative() && !m.is_zero()) {
            return Err(RateError::validation("minimum hours cannot be negative"));
        }
        if self.rounding_increment == Some(0) {
            return Err(RateError::validation("rounding increment must be positive"));
        }
        if let Some(to) = self.effective.to {
            if to < self.effective.from {
                return Err(RateError::validation("effective_to precedes effective_from"));
            }
        }
        if !self.applies_to_all_services && self.service_type.is_none() {
            return Err(RateError::validation(
                "rate card needs a service type or must apply to all services",
            ));
        }
        Ok(())
    }

    /// Converts worked hours into billable hours
    ///
    /// # Errors
    ///
    /// Returns `Validation` for negative hours
    pub fn calculate_billable_hours(&self, actual_hours: Decimal) -> Result<Decimal, RateError> {
        if actual_hours.is_sign_negative() && !actual_hours.is_zero() {
            return Err(RateError::validation(format!(
                "worked hours cannot be negative: {}",
                actual_hours
            )));
        }

        let mut hours = match self.minimum_hours {
            Some(minimum) if actual_hours < minimum => minimum,
            _ => actual_hours,
        };

        if let Some(increment) = self.rounding_increment.filter(|i| *i > 0) {
            if self.rounding_method != RoundingMethod::None {
                // work in minutes so increments like 15 or 6 stay exact
                let increment = Decimal::from(increment);
                let units = hours * dec!(60) / increment;
                hours = self.rounding_method.snap(units) * increment / dec!(60);
            }
        }

        let billable = round_half_up(hours, 2);
        debug!(rate_card_id = %self.id, %actual_hours, %billable, "Billable hours calculated");
        Ok(billable)
    }

    /// `round(billable_hours × hourly_rate, 2)`
    pub fn calculate_amount(&self, actual_hours: Decimal) -> Result<Money, RateError> {
        let billable = self.calculate_billable_hours(actual_hours)?;
        Ok(self.hourly_rate.extend(billable))
    }
}
