//! Contract billing configuration
//!
//! # Billing Models
//!
//! - **Fixed**: one static recurring charge
//! - **PerAsset**: a rate per covered asset, by asset type
//! - **PerContact**: a rate per contact, by access tier
//! - **Tiered**: volume priced against ascending bands
//! - **Hybrid**: the sum of whichever of the above are configured
//!
//! A configuration is only valid when the populated fields fit the model.
//! Fields belonging to another model are rejected rather than ignored.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use core_kernel::{Currency, Money};

use crate::error::ContractError;

/// How a contract's recurring charge is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingModel {
    Fixed,
    PerAsset,
    PerContact,
    Tiered,
    Hybrid,
}

impl fmt::Display for BillingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BillingModel::Fixed => "fixed",
            BillingModel::PerAsset => "per_asset",
            BillingModel::PerContact => "per_contact",
            BillingModel::Tiered => "tiered",
            BillingModel::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

/// Static recurring charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedCharge {
    pub description: String,
    pub amount: Money,
}

/// Pricing for one asset type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetBillingRule {
    /// Monthly rate per asset
    pub rate: Money,
    /// One-time fee per newly attached asset
    pub setup_fee: Option<Money>,
    /// When non-empty, only assets enrolled in one of these services count
    #[serde(default)]
    pub service_types: Vec<String>,
}

impl AssetBillingRule {
    pub fn new(rate: Money) -> Self {
        Self {
            rate,
            setup_fee: None,
            service_types: Vec::new(),
        }
    }

    pub fn with_setup_fee(mut self, fee: Money) -> Self {
        self.setup_fee = Some(fee);
        self
    }

    pub fn scoped_to(mut self, service_type: impl Into<String>) -> Self {
        self.service_types.push(service_type.into());
        self
    }
}

/// A named level of portal access billed per contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactAccessTier {
    pub name: String,
    pub rate: Money,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// What a tiered contract counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeBasis {
    Assets,
    Contacts,
}

/// How bands price a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierPolicy {
    /// The band containing the volume prices every unit
    Cliff,
    /// Each band prices only the units inside it
    Graduated,
}

/// One price band; `up_to = None` is the unbounded last band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierBand {
    pub up_to: Option<u32>,
    pub unit_rate: Money,
}

/// Volume pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TieredPricing {
    pub basis: VolumeBasis,
    pub policy: TierPolicy,
    pub bands: Vec<TierBand>,
}

impl TieredPricing {
    fn validate(&self) -> Result<(), String> {
        let (last, rest) = self
            .bands
            .split_last()
            .ok_or_else(|| "tiered pricing needs at least one band".to_string())?;
        if last.up_to.is_some() {
            return Err("the last band must be unbounded".into());
        }

        let mut previous = 0u32;
        for band in rest {
            let up_to = band
                .up_to
                .ok_or_else(|| "only the last band may be unbounded".to_string())?;
            if up_to <= previous {
                return Err(format!("band thresholds must ascend: {} after {}", up_to, previous));
            }
            previous = up_to;
        }
        Ok(())
    }
}

/// What activation assigns automatically
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationFlags {
    pub auto_assign_assets: bool,
    pub auto_assign_contacts: bool,
    /// Tier given to auto-assigned contacts without a valid tier
    pub default_contact_tier: Option<String>,
}

/// Complete billing configuration of a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingConfig {
    pub model: BillingModel,
    pub fixed_charge: Option<FixedCharge>,
    /// Keyed by asset type; ordered so charges are computed deterministically
    #[serde(default)]
    pub asset_rules: BTreeMap<String, AssetBillingRule>,
    #[serde(default)]
    pub contact_tiers: Vec<ContactAccessTier>,
    pub tiered: Option<TieredPricing>,
    #[serde(default)]
    pub automation: AutomationFlags,
}

impl BillingConfig {
    fn empty(model: BillingModel) -> Self {
        Self {
            model,
            fixed_charge: None,
            asset_rules: BTreeMap::new(),
            contact_tiers: Vec::new(),
            tiered: None,
            automation: AutomationFlags::default(),
        }
    }

    pub fn fixed(description: impl Into<String>, amount: Money) -> Self {
        Self {
            fixed_charge: Some(FixedCharge {
                description: description.into(),
                amount,
            }),
            ..Self::empty(BillingModel::Fixed)
        }
    }

    pub fn per_asset(rules: impl IntoIterator<Item = (String, AssetBillingRule)>) -> Self {
        Self {
            asset_rules: rules.into_iter().collect(),
            ..Self::empty(BillingModel::PerAsset)
        }
    }

    pub fn per_contact(tiers: Vec<ContactAccessTier>) -> Self {
        Self {
            contact_tiers: tiers,
            ..Self::empty(BillingModel::PerContact)
        }
    }

    pub fn tiered(pricing: TieredPricing) -> Self {
        Self {
            tiered: Some(pricing),
            ..Self::empty(BillingModel::Tiered)
        }
    }

    /// A hybrid configuration; populate the sub-model fields directly
    pub fn hybrid() -> Self {
        Self::empty(BillingModel::Hybrid)
    }

    pub fn with_automation(mut self, automation: AutomationFlags) -> Self {
        self.automation = automation;
        self
    }

    /// Looks up a contact tier by name
    pub fn tier(&self, name: &str) -> Result<&ContactAccessTier, ContractError> {
        self.contact_tiers
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ContractError::TierNotFound(name.to_string()))
    }

    /// Checks that the configuration fits the model and the contract currency
    pub fn validate(&self, currency: Currency) -> Result<(), ContractError> {
        let model = self.model;
        let has_fixed = self.fixed_charge.is_some();
        let has_assets = !self.asset_rules.is_empty();
        let has_contacts = !self.contact_tiers.is_empty();
        let has_tiered = self.tiered.is_some();

        let (required, present) = match model {
            BillingModel::Fixed => ("fixed_charge", has_fixed),
            BillingModel::PerAsset => ("asset_billing_rules", has_assets),
            BillingModel::PerContact => ("contact_access_tiers", has_contacts),
            BillingModel::Tiered => ("tiered_pricing", has_tiered),
            BillingModel::Hybrid => (
                "at least one sub-model",
                has_fixed || has_assets || has_contacts || has_tiered,
            ),
        };
        if !present {
            return Err(ContractError::invalid_config(model, format!("{} is required", required)));
        }

        if model != BillingModel::Hybrid {
            let foreign = [
                (BillingModel::Fixed, has_fixed, "fixed_charge"),
                (BillingModel::PerAsset, has_assets, "asset_billing_rules"),
                (BillingModel::PerContact, has_contacts, "contact_access_tiers"),
                (BillingModel::Tiered, has_tiered, "tiered_pricing"),
            ]
            .into_iter()
            .find(|(owner, populated, _)| *populated && *owner != model);
            if let Some((_, _, field)) = foreign {
                return Err(ContractError::invalid_config(
                    model,
                    format!("{} does not belong to this model", field),
                ));
            }
        }

        let check_money = |what: &str, money: &Money| -> Result<(), ContractError> {
            if money.currency() != currency {
                return Err(ContractError::invalid_config(
                    model,
                    format!("{} is in {} but the contract bills in {}", what, money.currency(), currency),
                ));
            }
            if money.is_negative() {
                return Err(ContractError::invalid_config(model, format!("{} cannot be negative", what)));
            }
            Ok(())
        };

        if let Some(fixed) = &self.fixed_charge {
            check_money("fixed charge", &fixed.amount)?;
        }
        for (asset_type, rule) in &self.asset_rules {
            if asset_type.trim().is_empty() {
                return Err(ContractError::invalid_config(model, "asset type cannot be blank"));
            }
            check_money(asset_type, &rule.rate)?;
            if let Some(fee) = &rule.setup_fee {
                check_money(asset_type, fee)?;
            }
        }

        let mut names = HashSet::new();
        for tier in &self.contact_tiers {
            if tier.name.trim().is_empty() || !names.insert(tier.name.as_str()) {
                return Err(ContractError::invalid_config(
                    model,
                    format!("contact tier names must be unique and non-blank: '{}'", tier.name),
                ));
            }
            check_money(&tier.name, &tier.rate)?;
        }

        if let Some(tiered) = &self.tiered {
            tiered
                .validate()
                .map_err(|reason| ContractError::invalid_config(model, reason))?;
            for band in &tiered.bands {
                check_money("tier band", &band.unit_rate)?;
            }
        }

        if self.automation.auto_assign_contacts {
            match &self.automation.default_contact_tier {
                Some(name) => {
                    self.tier(name)?;
                }
                None if has_contacts => {
                    return Err(ContractError::invalid_config(
                        model,
                        "auto-assigning contacts needs a default contact tier",
                    ));
                }
                None => {}
            }
        }

        Ok(())
    }
}
