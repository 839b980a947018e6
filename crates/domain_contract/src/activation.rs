//! Contract activation
//!
//! Planning is pure: it decides which of the client's unassigned assets and
//! contacts the contract should pick up. Activation hands the plan to an
//! [`AssignmentSink`] and only then marks the contract active.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use core_kernel::{AssetId, ContactId, ContractId, OperationContext};

use crate::contract::{Contract, ContractStatus};
use crate::error::ContractError;
use crate::snapshot::ClientSnapshot;

/// A contact assignment with the tier it gets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactAssignment {
    pub contact_id: ContactId,
    /// `None` when the contract bills no contact tiers
    pub tier: Option<String>,
}

/// What activating a contract will assign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationPlan {
    pub contract_id: ContractId,
    pub assets: Vec<AssetId>,
    pub contacts: Vec<ContactAssignment>,
}

impl ActivationPlan {
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty() && self.contacts.is_empty()
    }
}

/// Persists assignments produced by activation
#[async_trait]
pub trait AssignmentSink: Send + Sync {
    async fn assign(&self, plan: &ActivationPlan, ctx: &OperationContext) -> Result<(), ContractError>;
}

/// Computes the assignments implied by the automation flags
///
/// Only assets and contacts not yet assigned to any contract are picked up.
/// With asset rules configured, only assets of a priced type are assigned.
/// Contacts keep a valid existing tier and otherwise get the default tier.
pub fn plan_activation(
    contract: &Contract,
    snapshot: &ClientSnapshot,
) -> Result<ActivationPlan, ContractError> {
    contract.validate()?;
    if snapshot.client_id != contract.client_id {
        return Err(ContractError::validation("snapshot belongs to another client"));
    }

    let config = &contract.billing;
    let automation = &config.automation;

    let assets = if automation.auto_assign_assets {
        snapshot
            .assets
            .iter()
            .filter(|a| a.contract_id.is_none())
            .filter(|a| config.asset_rules.is_empty() || config.asset_rules.contains_key(&a.asset_type))
            .map(|a| a.id)
            .collect()
    } else {
        Vec::new()
    };

    let mut contacts = Vec::new();
    if automation.auto_assign_contacts {
        for contact in snapshot.contacts.iter().filter(|c| c.contract_id.is_none()) {
            let existing = contact
                .access_tier
                .as_deref()
                .filter(|name| config.tier(name).is_ok());
            let tier = match (existing, &automation.default_contact_tier) {
                (Some(name), _) => Some(name.to_string()),
                (None, Some(default)) => Some(config.tier(default)?.name.clone()),
                (None, None) => None,
            };
            contacts.push(ContactAssignment {
                contact_id: contact.id,
                tier,
            });
        }
    }

    Ok(ActivationPlan {
        contract_id: contract.id,
        assets,
        contacts,
    })
}

/// Activates a draft or suspended contract
///
/// The contract is only changed after the sink accepted the plan.
#[instrument(skip(contract, snapshot, sink, ctx), fields(contract_id = %contract.id))]
pub async fn activate(
    contract: &mut Contract,
    snapshot: &ClientSnapshot,
    sink: &dyn AssignmentSink,
    ctx: &OperationContext,
) -> Result<ActivationPlan, ContractError> {
    if contract.company_id != ctx.company_id {
        return Err(ContractError::CompanyMismatch(format!(
            "contract {} belongs to {}",
            contract.id, contract.company_id
        )));
    }
    if !matches!(contract.status, ContractStatus::Draft | ContractStatus::Suspended) {
        return Err(ContractError::InvalidTransition {
            from: contract.status,
            action: "activate",
        });
    }
    let today = ctx.today();
    if contract.end_date.is_some_and(|end| end < today) {
        return Err(ContractError::OutsideTerm {
            contract_id: contract.id,
            date: today,
        });
    }

    let plan = plan_activation(contract, snapshot)?;
    if !plan.is_empty() {
        sink.assign(&plan, ctx).await?;
    }
    contract.mark_active(ctx);

    info!(
        assets = plan.assets.len(),
        contacts = plan.contacts.len(),
        "Contract activated"
    );
    Ok(plan)
}
