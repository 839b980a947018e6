//! Asset Domain - Depreciation
//!
//! Year-by-year depreciation schedules for client assets and the derived
//! book value on any date.
//!
//! # Methods
//!
//! - **straight_line**: equal charge each year
//! - **declining_balance**: fixed rate on the opening book value
//! - **double_declining**: declining balance at `2 / life` unless overridden
//! - **sum_of_years**: charge weighted by remaining life
//! - **units_of_production**: charge proportional to yearly usage
//!
//! Book value never drops below salvage value. Straight-line and
//! sum-of-years schedules end exactly at salvage.

pub mod error;
pub mod method;
pub mod record;
pub mod schedule;
pub mod status;

pub use error::DepreciationError;
pub use method::DepreciationMethod;
pub use record::{AssetDepreciation, MAX_USEFUL_LIFE_YEARS};
pub use schedule::{depreciation_schedule, ScheduleEntry};
pub use status::{status_as_of, DepreciationStatus};
