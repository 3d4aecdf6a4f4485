//! Factories for sample domain entities.

use sweep_core::ids::{CloudAccountId, PipelineId, PolicyId};
use sweep_core::pipeline::{Pipeline, ScheduleSpec};
use sweep_core::policy::{CloudAccount, CloudProvider, Policy};

/// An AWS account with throwaway credentials.
pub fn aws_account() -> CloudAccount {
    CloudAccount {
        id: CloudAccountId::new(),
        name: "test-account".to_string(),
        provider: CloudProvider::Aws,
        access_key: "AKIATEST".to_string(),
        secret_key: "secret".to_string(),
    }
}

/// A policy with a minimal valid JSON document.
pub fn policy(account_id: CloudAccountId) -> Policy {
    Policy {
        id: PolicyId::new(),
        cloud_account_id: account_id,
        document: r#"{"policies":[{"name":"stop-idle","resource":"ec2"}]}"#.to_string(),
        is_default: false,
    }
}

/// A policy whose document marks it for failure in the stub engine.
pub fn bad_policy(account_id: CloudAccountId) -> Policy {
    Policy {
        id: PolicyId::new(),
        cloud_account_id: account_id,
        document: r#"{"policies":[{"name":"bad-policy","resource":"ec2"}]}"#.to_string(),
        is_default: false,
    }
}

/// An enabled pipeline running daily at midnight.
pub fn pipeline(policies: Vec<PolicyId>) -> Pipeline {
    Pipeline {
        id: PipelineId::new(),
        name: "nightly-cleanup".to_string(),
        policies,
        regions: vec!["us-east-1".to_string()],
        schedule: ScheduleSpec::new("0", "0", "*", "*", "*"),
        enabled: true,
        is_default: false,
        run_status: Default::default(),
        last_run_time: 0,
    }
}
