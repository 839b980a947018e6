//! Contract Domain - Recurring Billing Models
//!
//! This crate computes the monthly recurring charge of a managed-services
//! contract from a snapshot of the client's assets and contacts.
//!
//! # Billing Models
//!
//! - **fixed**: a single static charge
//! - **per_asset**: rate × count per asset type, plus one-time setup fees
//! - **per_contact**: rate per contact, grouped by access tier
//! - **tiered**: volume priced against ascending bands (cliff or graduated)
//! - **hybrid**: the sum of every configured sub-model
//!
//! The calculation is pure and deterministic, so it serves both previews
//! and automated invoice generation. Activation is the only mutation and is
//! kept separate from it.
//!
//! # Example
//!
//! ```rust,ignore
//! let charge = calculate_monthly_charge(&contract, &snapshot, as_of)?;
//! invoice_items.extend(charge.invoice_items());
//! ```

pub mod activation;
pub mod charge;
pub mod config;
pub mod contract;
pub mod error;
pub mod snapshot;

pub use activation::{activate, plan_activation, ActivationPlan, AssignmentSink, ContactAssignment};
pub use charge::{calculate_monthly_charge, ChargeKind, ChargeLine, MonthlyCharge};
pub use config::{
    AssetBillingRule, AutomationFlags, BillingConfig, BillingModel, ContactAccessTier, FixedCharge,
    TierBand, TierPolicy, TieredPricing, VolumeBasis,
};
pub use contract::{Contract, ContractStatus};
pub use error::ContractError;
pub use snapshot::{AssetSnapshot, ClientSnapshot, ContactSnapshot};
