//! Client directory snapshots
//!
//! Immutable, fully loaded views of a client's assets and contacts, supplied
//! by the directory collaborator for a single calculation.

use serde::{Deserialize, Serialize};

use core_kernel::{AssetId, ClientId, ContactId, ContractId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub id: AssetId,
    pub asset_type: String,
    /// Services the asset is enrolled in
    #[serde(default)]
    pub service_types: Vec<String>,
    /// Attached since the previous billing cycle
    #[serde(default)]
    pub newly_attached: bool,
    /// Contract the asset is assigned to; assets of another contract are
    /// billed there, not here
    pub contract_id: Option<ContractId>,
}

impl AssetSnapshot {
    pub fn new(asset_type: impl Into<String>) -> Self {
        Self {
            id: AssetId::new(),
            asset_type: asset_type.into(),
            service_types: Vec::new(),
            newly_attached: false,
            contract_id: None,
        }
    }

    pub fn enrolled_in(mut self, service_type: impl Into<String>) -> Self {
        self.service_types.push(service_type.into());
        self
    }

    pub fn newly_attached(mut self) -> Self {
        self.newly_attached = true;
        self
    }

    pub fn assigned_to(mut self, contract_id: ContractId) -> Self {
        self.contract_id = Some(contract_id);
        self
    }

    /// Unassigned, or assigned to `contract_id`
    pub fn billable_under(&self, contract_id: ContractId) -> bool {
        self.contract_id.map_or(true, |assigned| assigned == contract_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSnapshot {
    pub id: ContactId,
    pub name: String,
    /// Name of the assigned access tier
    pub access_tier: Option<String>,
    pub contract_id: Option<ContractId>,
}

impl ContactSnapshot {
    pub fn new(name: impl Into<String>, access_tier: Option<&str>) -> Self {
        Self {
            id: ContactId::new(),
            name: name.into(),
            access_tier: access_tier.map(str::to_string),
            contract_id: None,
        }
    }

    pub fn assigned_to(mut self, contract_id: ContractId) -> Self {
        self.contract_id = Some(contract_id);
        self
    }

    /// Unassigned, or assigned to `contract_id`
    pub fn billable_under(&self, contract_id: ContractId) -> bool {
        self.contract_id.map_or(true, |assigned| assigned == contract_id)
    }
}

/// Assets and contacts of one client at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub client_id: ClientId,
    #[serde(default)]
    pub assets: Vec<AssetSnapshot>,
    #[serde(default)]
    pub contacts: Vec<ContactSnapshot>,
}

impl ClientSnapshot {
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            assets: Vec::new(),
            contacts: Vec::new(),
        }
    }

    pub fn with_assets(mut self, assets: impl IntoIterator<Item = AssetSnapshot>) -> Self {
        self.assets.extend(assets);
        self
    }

    pub fn with_contacts(mut self, contacts: impl IntoIterator<Item = ContactSnapshot>) -> Self {
        self.contacts.extend(contacts);
        self
    }
}
