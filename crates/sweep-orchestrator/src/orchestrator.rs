//! Pipeline run orchestration.

use crate::engine::PolicyEngine;
use crate::output;
use chrono::Utc;
use std::sync::Arc;
use sweep_core::ids::{PipelineId, PolicyId};
use sweep_core::pipeline::{Pipeline, RunStatus};
use sweep_core::policy::{PolicyResult, RegionResult};
use sweep_core::ports::{
    CloudAccountStore, CredentialValidator, PipelineStore, PolicyResultStore, PolicyStore,
};
use sweep_core::{Error, Result};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

// Per-policy failure reasons recorded in policy results.
const STATUS_DB_ERROR: &str = "Internal DB Error";
const STATUS_POLICY_MISSING: &str = "Policy Definition missing";
const STATUS_INVALID_POLICY: &str = "Invalid policy definition";
const STATUS_ACCOUNT_MISSING: &str = "Missing Cloud Account definition for policy";
const STATUS_AUTH_FAILED: &str = "Authentication Failed";
const STATUS_INTERNAL_ERROR: &str = "Internal Error";

/// Handle to an accepted, asynchronously-executing pipeline run.
///
/// Scheduled fires drop the handle; interactive callers and tests may
/// await the outcome.
#[derive(Debug)]
pub struct RunHandle {
    inner: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Wait for the run to finish and return its outcome.
    pub async fn wait(self) -> Result<RunOutcome> {
        self.inner
            .await
            .map_err(|e| Error::Internal(format!("run task failed: {e}")))
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub pipeline_id: PipelineId,
    pub status: RunStatus,
    /// True when the run was suppressed because one was already in
    /// progress (or the begin-run write failed); no state was mutated.
    pub skipped: bool,
    pub policy_outcomes: Vec<PolicyOutcome>,
}

#[derive(Debug, Clone)]
pub struct PolicyOutcome {
    pub policy_id: PolicyId,
    pub status: String,
}

/// Validates requested runs, executes every policy in a pipeline against
/// its cloud account, and converges pipeline and policy-result state.
pub struct Orchestrator {
    pipelines: Arc<dyn PipelineStore>,
    policies: Arc<dyn PolicyStore>,
    accounts: Arc<dyn CloudAccountStore>,
    results: Arc<dyn PolicyResultStore>,
    credentials: Arc<dyn CredentialValidator>,
    engine: Arc<PolicyEngine>,
}

impl Orchestrator {
    pub fn new(
        pipelines: Arc<dyn PipelineStore>,
        policies: Arc<dyn PolicyStore>,
        accounts: Arc<dyn CloudAccountStore>,
        results: Arc<dyn PolicyResultStore>,
        credentials: Arc<dyn CredentialValidator>,
        engine: Arc<PolicyEngine>,
    ) -> Self {
        Self {
            pipelines,
            policies,
            accounts,
            results,
            credentials,
            engine,
        }
    }

    /// Validate a run request and, if accepted, hand execution off to a
    /// background task.
    ///
    /// Returns promptly in all cases; execution time (possibly minutes)
    /// is never on this path. Rejections map to HTTP-style codes via
    /// [`Error::http_status`]: unknown pipeline/policy/account are 404,
    /// an empty policy list or failed credential check are 409.
    pub async fn submit_run(self: &Arc<Self>, pipeline_id: PipelineId) -> Result<RunHandle> {
        let pipeline = self
            .pipelines
            .get(pipeline_id)
            .await?
            .ok_or_else(|| Error::PipelineNotFound(pipeline_id.to_string()))?;

        let first_policy_id = *pipeline.policies.first().ok_or(Error::NoPolicies)?;

        let policy = self
            .policies
            .get(first_policy_id)
            .await?
            .ok_or_else(|| Error::PolicyNotFound(first_policy_id.to_string()))?;

        let account = self
            .accounts
            .get(policy.cloud_account_id)
            .await?
            .ok_or_else(|| Error::CloudAccountNotFound(policy.cloud_account_id.to_string()))?;

        if !self.credentials.validate(&account).await? {
            return Err(Error::AuthenticationFailed);
        }

        info!(pipeline_id = %pipeline_id, name = %pipeline.name, "pipeline run accepted");
        let orchestrator = self.clone();
        let inner = tokio::spawn(async move { orchestrator.run_pipeline(pipeline).await });
        Ok(RunHandle { inner })
    }

    /// Asynchronous run body: claim the pipeline, execute every policy in
    /// list order, then record the terminal status.
    async fn run_pipeline(self: Arc<Self>, pipeline: Pipeline) -> RunOutcome {
        let pipeline_id = pipeline.id;
        let mut outcome = RunOutcome {
            pipeline_id,
            status: RunStatus::Unknown,
            skipped: true,
            policy_outcomes: vec![],
        };

        // Atomic claim: exactly one concurrent fire can transition the
        // pipeline to RUNNING.
        match self.pipelines.begin_run(pipeline_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(pipeline_id = %pipeline_id, "run already in progress, skipping");
                outcome.status = RunStatus::Running;
                return outcome;
            }
            Err(e) => {
                error!(pipeline_id = %pipeline_id, error = %e, "failed to mark pipeline running");
                return outcome;
            }
        }
        outcome.skipped = false;

        let mut any_failed = false;
        for policy_id in &pipeline.policies {
            let result = self.execute_policy(*policy_id, &pipeline).await;
            any_failed |= !result.is_success();
            if let Err(e) = self.results.upsert(&result).await {
                error!(policy_id = %policy_id, error = %e, "failed to persist policy result");
            }
            outcome.policy_outcomes.push(PolicyOutcome {
                policy_id: *policy_id,
                status: result.last_run_status,
            });
        }

        outcome.status = if any_failed {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        if let Err(e) = self
            .pipelines
            .finish_run(pipeline_id, outcome.status, Utc::now().timestamp())
            .await
        {
            // Logged only; the run itself already happened.
            error!(pipeline_id = %pipeline_id, error = %e, "failed to record terminal run status");
        }

        info!(
            pipeline_id = %pipeline_id,
            status = ?outcome.status,
            policies = outcome.policy_outcomes.len(),
            "pipeline run finished"
        );
        outcome
    }

    /// Execute one policy. Failures are recorded per policy and never
    /// abort the pipeline.
    async fn execute_policy(&self, policy_id: PolicyId, pipeline: &Pipeline) -> PolicyResult {
        let policy = match self.policies.get(policy_id).await {
            Ok(Some(policy)) => policy,
            Ok(None) => {
                warn!(policy_id = %policy_id, "policy definition missing");
                return PolicyResult::failure(policy_id, STATUS_POLICY_MISSING);
            }
            Err(e) => {
                error!(policy_id = %policy_id, error = %e, "policy fetch failed");
                return PolicyResult::failure(policy_id, STATUS_DB_ERROR);
            }
        };

        let workdir = match self.engine.prepare_workdir(&policy) {
            Ok(workdir) => workdir,
            Err(e) => {
                warn!(policy_id = %policy_id, error = %e, "policy document conversion failed");
                return PolicyResult::failure(policy_id, STATUS_INVALID_POLICY);
            }
        };

        let account = match self.accounts.get(policy.cloud_account_id).await {
            Ok(Some(account)) => account,
            Ok(None) | Err(_) => {
                warn!(
                    policy_id = %policy_id,
                    account_id = %policy.cloud_account_id,
                    "cloud account missing for policy"
                );
                return PolicyResult::failure(policy_id, STATUS_ACCOUNT_MISSING);
            }
        };

        match self.credentials.validate(&account).await {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                warn!(policy_id = %policy_id, account_id = %account.id, "credential check failed");
                return PolicyResult::failure(policy_id, STATUS_AUTH_FAILED);
            }
        }

        let region = pipeline.regions.first().cloned().unwrap_or_default();
        let raw = match self.engine.run(&workdir, &account, &region).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(policy_id = %policy_id, error = %e, "policy engine invocation failed");
                return PolicyResult::failure(policy_id, STATUS_INTERNAL_ERROR);
            }
        };

        if output::is_error(&raw) {
            warn!(policy_id = %policy_id, "policy engine reported errors");
            return PolicyResult::failure(policy_id, STATUS_INTERNAL_ERROR);
        }

        let parsed = match output::parse(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(policy_id = %policy_id, error = %e, "unparseable engine output");
                return PolicyResult::failure(policy_id, STATUS_INTERNAL_ERROR);
            }
        };

        let payload = match self.engine.read_resources(&workdir, &parsed.policy_name) {
            Ok(payload) => payload,
            Err(e) => {
                error!(policy_id = %policy_id, error = %e, "failed to read resources file");
                return PolicyResult::failure(policy_id, STATUS_INTERNAL_ERROR);
            }
        };

        PolicyResult::success(
            policy_id,
            parsed.resource_type,
            RegionResult { region, payload },
        )
    }
}
