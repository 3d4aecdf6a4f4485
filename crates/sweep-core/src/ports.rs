//! Port traits (hexagonal architecture).
//!
//! These traits define the interfaces between the core domain and external
//! adapters: the persistence layer, credential validation, and retention
//! targets. Adapters return consistent snapshots; the core does not
//! implement transactions.

use crate::ids::{CloudAccountId, PipelineId, PolicyId};
use crate::pipeline::{Pipeline, RunStatus};
use crate::policy::{CloudAccount, Policy, PolicyResult};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository for pipelines.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Get a pipeline by ID.
    async fn get(&self, id: PipelineId) -> Result<Option<Pipeline>>;

    /// List all enabled pipelines.
    async fn list_enabled(&self) -> Result<Vec<Pipeline>>;

    /// Update a pipeline record.
    async fn update(&self, pipeline: &Pipeline) -> Result<()>;

    /// Atomically transition `run_status` to [`RunStatus::Running`].
    ///
    /// Returns `true` if this call performed the transition, `false` if
    /// the pipeline was already running. A SQL adapter implements this as
    /// a single conditional UPDATE so two concurrent fires cannot both
    /// win.
    async fn begin_run(&self, id: PipelineId) -> Result<bool>;

    /// Record the terminal status and last-run time of a finished run.
    async fn finish_run(
        &self,
        id: PipelineId,
        status: RunStatus,
        last_run_time: i64,
    ) -> Result<()>;
}

/// Repository for policies.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn get(&self, id: PolicyId) -> Result<Option<Policy>>;
}

/// Repository for cloud accounts.
#[async_trait]
pub trait CloudAccountStore: Send + Sync {
    async fn get(&self, id: CloudAccountId) -> Result<Option<CloudAccount>>;
}

/// Repository for per-policy run results.
#[async_trait]
pub trait PolicyResultStore: Send + Sync {
    /// Insert or overwrite the single result record for a policy.
    async fn upsert(&self, result: &PolicyResult) -> Result<()>;
}

/// Credential check consumed before running a pipeline or a policy.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(&self, account: &CloudAccount) -> Result<bool>;
}

/// Bulk-deletion target for retention sweepers.
#[async_trait]
pub trait RetentionStore: Send + Sync {
    /// Delete all records with a timestamp below `cutoff`, returning the
    /// number deleted.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
