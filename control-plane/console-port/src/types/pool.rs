use crate::string_id;
use serde::{Deserialize, Serialize};

string_id!(PoolId, "Unique identifier of a vm pool.");

/// A pool of stateless virtual machines users can take vms from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VmPool {
    /// Id of the pool.
    pub id: PoolId,
    /// Human readable name.
    pub name: String,
    /// Maximum number of vms the pool may instantiate.
    #[serde(default)]
    pub max_vms: u64,
    /// Number of vms currently taken from the pool.
    #[serde(default)]
    pub vms_in_use: u64,
}
