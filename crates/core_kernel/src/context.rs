//! Explicit operation context
//!
//! Every side-effecting operation receives the company it runs for, the
//! acting user, and a clock. Nothing in the core reads an ambient
//! "current user" or the system time directly.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::identifiers::{CompanyId, UserId};
use crate::temporal::Timezone;

/// Source of the current instant
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant, for previews and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Who is acting, for which company, and when
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub company_id: CompanyId,
    pub actor_id: UserId,
    pub timezone: Timezone,
    clock: Arc<dyn Clock>,
}

impl OperationContext {
    /// Creates a context backed by the system clock in UTC
    pub fn new(company_id: CompanyId, actor_id: UserId) -> Self {
        Self {
            company_id,
            actor_id,
            timezone: Timezone::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets the company timezone used to derive `today`
    pub fn with_timezone(mut self, timezone: Timezone) -> Self {
        self.timezone = timezone;
        self
    }

    /// Current instant according to the context clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current calendar date in the company timezone
    pub fn today(&self) -> NaiveDate {
        self.timezone.local_date(self.now())
    }
}
