//! Policy, cloud account, and per-run result types.

use crate::ids::{CloudAccountId, PolicyId};
use serde::{Deserialize, Serialize};

/// A declarative rule set describing resources to inspect or act upon
/// within a cloud account. The document body is provider-specific and
/// opaque to the orchestrator; it is translated verbatim into the policy
/// engine's input format at run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub cloud_account_id: CloudAccountId,
    /// Stored policy document, JSON-encoded.
    pub document: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudAccount {
    pub id: CloudAccountId,
    pub name: String,
    pub provider: CloudProvider,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
}

impl CloudProvider {
    /// Prefix for the credential environment variables handed to the
    /// policy engine (`{PREFIX}_ACCESS_KEY_ID` and friends).
    pub fn env_prefix(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "AWS",
            CloudProvider::Azure => "AZURE",
            CloudProvider::Gcp => "GCP",
        }
    }
}

/// Outcome of the most recent execution of a policy. One logical record
/// per policy, overwritten on each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResult {
    pub policy_id: PolicyId,
    /// "SUCCESS" or a failure reason.
    pub last_run_status: String,
    /// Resource type the policy matched, when the run parsed successfully.
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub region_results: Vec<RegionResult>,
}

impl PolicyResult {
    pub const STATUS_SUCCESS: &'static str = "SUCCESS";

    pub fn success(policy_id: PolicyId, resource_type: String, region: RegionResult) -> Self {
        Self {
            policy_id,
            last_run_status: Self::STATUS_SUCCESS.to_string(),
            resource_type: Some(resource_type),
            region_results: vec![region],
        }
    }

    pub fn failure(policy_id: PolicyId, reason: impl Into<String>) -> Self {
        Self {
            policy_id,
            last_run_status: reason.into(),
            resource_type: None,
            region_results: vec![],
        }
    }

    pub fn is_success(&self) -> bool {
        self.last_run_status == Self::STATUS_SUCCESS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionResult {
    pub region: String,
    /// Raw resource payload read from the engine's resources file.
    pub payload: String,
}
