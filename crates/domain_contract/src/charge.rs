//! Monthly charge calculation
//!
//! `calculate_monthly_charge` is a pure function of the contract, the client
//! snapshot, and the as-of date. Asset rules are visited in asset-type order
//! and contact tiers in configuration order, so the same inputs always give
//! the same lines in the same order.
//!
//! Only Draft and Active contracts are priced; Draft pricing serves previews.
//! Assets and contacts already assigned to another contract are not counted.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{ContactId, ContractId, Money};
use domain_billing::{InvoiceItem, InvoiceItemType};

use crate::config::{BillingConfig, TierPolicy, TieredPricing, VolumeBasis};
use crate::contract::{Contract, ContractStatus};
use crate::error::ContractError;
use crate::snapshot::{AssetSnapshot, ClientSnapshot, ContactSnapshot};

/// Whether a line recurs every month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeKind {
    Recurring,
    SetupFee,
}

/// One line of a monthly charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeLine {
    pub description: String,
    pub quantity: Decimal,
    pub rate: Money,
    pub amount: Money,
    pub kind: ChargeKind,
}

impl ChargeLine {
    fn new(description: impl Into<String>, count: usize, rate: Money, kind: ChargeKind) -> Self {
        let quantity = Decimal::from(count as u64);
        Self {
            description: description.into(),
            quantity,
            rate,
            amount: rate.extend(quantity),
            kind,
        }
    }

    pub fn to_invoice_item(&self) -> InvoiceItem {
        let item_type = match self.kind {
            ChargeKind::Recurring => InvoiceItemType::Recurring,
            ChargeKind::SetupFee => InvoiceItemType::SetupFee,
        };
        InvoiceItem::new(self.description.clone(), item_type, self.rate).with_quantity(self.quantity)
    }
}

/// The computed charge for one contract and month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCharge {
    pub contract_id: ContractId,
    pub as_of: NaiveDate,
    pub line_items: Vec<ChargeLine>,
    pub total: Money,
    /// Contacts whose tier name matches no configured tier
    pub unmatched_contacts: Vec<ContactId>,
}

impl MonthlyCharge {
    pub fn invoice_items(&self) -> Vec<InvoiceItem> {
        self.line_items.iter().map(ChargeLine::to_invoice_item).collect()
    }
}

/// Computes the recurring charge of a contract for the month containing
/// `as_of`
///
/// # Errors
///
/// - `NotBillable` when the contract is suspended or terminated
/// - `InvalidConfiguration` when the billing fields do not fit the model
/// - `OutsideTerm` when `as_of` is not inside the contract term
/// - `Validation` when the snapshot is for another client
pub fn calculate_monthly_charge(
    contract: &Contract,
    snapshot: &ClientSnapshot,
    as_of: NaiveDate,
) -> Result<MonthlyCharge, ContractError> {
    if matches!(contract.status, ContractStatus::Suspended | ContractStatus::Terminated) {
        return Err(ContractError::NotBillable {
            contract_id: contract.id,
            status: contract.status,
        });
    }
    contract.validate()?;
    if snapshot.client_id != contract.client_id {
        return Err(ContractError::validation(format!(
            "snapshot is for client {} but contract {} bills client {}",
            snapshot.client_id, contract.id, contract.client_id
        )));
    }
    if !contract.covers(as_of) {
        return Err(ContractError::OutsideTerm {
            contract_id: contract.id,
            date: as_of,
        });
    }

    // Validation guarantees that only the model's own fields are populated,
    // so a hybrid contract is simply every populated sub-model.
    let config = &contract.billing;
    let assets: Vec<&AssetSnapshot> = snapshot
        .assets
        .iter()
        .filter(|a| a.billable_under(contract.id))
        .collect();
    let contacts: Vec<&ContactSnapshot> = snapshot
        .contacts
        .iter()
        .filter(|c| c.billable_under(contract.id))
        .collect();

    let mut lines = fixed_lines(config);
    lines.extend(asset_lines(config, &assets));
    let (per_contact, unmatched_contacts) = contact_lines(config, &contacts);
    lines.extend(per_contact);
    if let Some(tiered) = &config.tiered {
        let volume = match tiered.basis {
            VolumeBasis::Assets => assets.len(),
            VolumeBasis::Contacts => contacts.len(),
        };
        lines.extend(tiered_lines(tiered, volume));
    }

    let amounts: Vec<Money> = lines.iter().map(|l| l.amount).collect();
    let total = Money::try_sum(contract.currency, &amounts)?.round_to_currency();

    debug!(
        contract_id = %contract.id,
        model = %config.model,
        lines = lines.len(),
        total = %total,
        "Monthly charge calculated"
    );

    Ok(MonthlyCharge {
        contract_id: contract.id,
        as_of,
        line_items: lines,
        total,
        unmatched_contacts,
    })
}

fn fixed_lines(config: &BillingConfig) -> Vec<ChargeLine> {
    config
        .fixed_charge
        .iter()
        .map(|f| ChargeLine::new(f.description.clone(), 1, f.amount, ChargeKind::Recurring))
        .collect()
}

fn asset_lines(config: &BillingConfig, assets: &[&AssetSnapshot]) -> Vec<ChargeLine> {
    let mut lines = Vec::new();

    for (asset_type, rule) in &config.asset_rules {
        let covered: Vec<&AssetSnapshot> = assets
            .iter()
            .copied()
            .filter(|a| &a.asset_type == asset_type)
            .filter(|a| {
                rule.service_types.is_empty()
                    || a.service_types.iter().any(|s| rule.service_types.contains(s))
            })
            .collect();
        if covered.is_empty() {
            continue;
        }

        lines.push(ChargeLine::new(asset_type.clone(), covered.len(), rule.rate, ChargeKind::Recurring));

        if let Some(fee) = rule.setup_fee {
            let new_count = covered.iter().filter(|a| a.newly_attached).count();
            if new_count > 0 {
                lines.push(ChargeLine::new(
                    format!("{} setup fee", asset_type),
                    new_count,
                    fee,
                    ChargeKind::SetupFee,
                ));
            }
        }
    }
    lines
}

fn contact_lines(config: &BillingConfig, contacts: &[&ContactSnapshot]) -> (Vec<ChargeLine>, Vec<ContactId>) {
    if config.contact_tiers.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let lines = config
        .contact_tiers
        .iter()
        .filter_map(|tier| {
            let count = contacts
                .iter()
                .filter(|c| c.access_tier.as_deref() == Some(tier.name.as_str()))
                .count();
            (count > 0).then(|| ChargeLine::new(tier.name.clone(), count, tier.rate, ChargeKind::Recurring))
        })
        .collect();

    let unmatched = contacts
        .iter()
        .filter(|c| matches!(&c.access_tier, Some(name) if config.tier(name).is_err()))
        .map(|c| c.id)
        .collect();

    (lines, unmatched)
}

fn band_label(basis: VolumeBasis, lower: u32, up_to: Option<u32>) -> String {
    let noun = match basis {
        VolumeBasis::Assets => "Assets",
        VolumeBasis::Contacts => "Contacts",
    };
    match up_to {
        Some(upper) => format!("{} {}-{}", noun, lower + 1, upper),
        None => format!("{} {}+", noun, lower + 1),
    }
}

fn tiered_lines(pricing: &TieredPricing, volume: usize) -> Vec<ChargeLine> {
    if volume == 0 {
        return Vec::new();
    }
    let volume = u32::try_from(volume).unwrap_or(u32::MAX);

    match pricing.policy {
        TierPolicy::Cliff => {
            let mut lower = 0u32;
            for band in &pricing.bands {
                match band.up_to {
                    Some(upper) if volume > upper => lower = upper,
                    _ => {
                        return vec![ChargeLine::new(
                            band_label(pricing.basis, lower, band.up_to),
                            volume as usize,
                            band.unit_rate,
                            ChargeKind::Recurring,
                        )]
                    }
                }
            }
            Vec::new()
        }
        TierPolicy::Graduated => {
            let mut lines = Vec::new();
            let mut lower = 0u32;
            for band in &pricing.bands {
                let upper = band.up_to.unwrap_or(u32::MAX);
                let units = volume.min(upper).saturating_sub(lower);
                if units > 0 {
                    lines.push(ChargeLine::new(
                        band_label(pricing.basis, lower, band.up_to),
                        units as usize,
                        band.unit_rate,
                        ChargeKind::Recurring,
                    ));
                }
                if volume <= upper {
                    break;
                }
                lower = upper;
            }
            lines
        }
    }
}
