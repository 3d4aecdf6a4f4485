//! In-memory port implementations used by integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use sweep_core::ids::{CloudAccountId, PipelineId, PolicyId};
use sweep_core::pipeline::{Pipeline, RunStatus};
use sweep_core::policy::{CloudAccount, Policy, PolicyResult};
use sweep_core::ports::{
    CloudAccountStore, CredentialValidator, PipelineStore, PolicyResultStore, PolicyStore,
    RetentionStore,
};
use sweep_core::{Error, Result};

#[derive(Default)]
pub struct MemoryPipelineStore {
    pipelines: Mutex<HashMap<PipelineId, Pipeline>>,
    finish_calls: AtomicUsize,
}

impl MemoryPipelineStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, pipeline: Pipeline) {
        self.pipelines.lock().unwrap().insert(pipeline.id, pipeline);
    }

    /// Snapshot for assertions.
    pub fn pipeline(&self, id: PipelineId) -> Option<Pipeline> {
        self.pipelines.lock().unwrap().get(&id).cloned()
    }

    /// Number of terminal-status writes observed.
    pub fn finish_calls(&self) -> usize {
        self.finish_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineStore for MemoryPipelineStore {
    async fn get(&self, id: PipelineId) -> Result<Option<Pipeline>> {
        Ok(self.pipelines.lock().unwrap().get(&id).cloned())
    }

    async fn list_enabled(&self) -> Result<Vec<Pipeline>> {
        Ok(self
            .pipelines
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.enabled)
            .cloned()
            .collect())
    }

    async fn update(&self, pipeline: &Pipeline) -> Result<()> {
        self.pipelines
            .lock()
            .unwrap()
            .insert(pipeline.id, pipeline.clone());
        Ok(())
    }

    async fn begin_run(&self, id: PipelineId) -> Result<bool> {
        let mut pipelines = self.pipelines.lock().unwrap();
        let pipeline = pipelines
            .get_mut(&id)
            .ok_or_else(|| Error::PipelineNotFound(id.to_string()))?;
        if pipeline.run_status == RunStatus::Running {
            return Ok(false);
        }
        pipeline.run_status = RunStatus::Running;
        Ok(true)
    }

    async fn finish_run(&self, id: PipelineId, status: RunStatus, last_run_time: i64) -> Result<()> {
        let mut pipelines = self.pipelines.lock().unwrap();
        let pipeline = pipelines
            .get_mut(&id)
            .ok_or_else(|| Error::PipelineNotFound(id.to_string()))?;
        pipeline.run_status = status;
        pipeline.last_run_time = last_run_time;
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPolicyStore {
    policies: Mutex<HashMap<PolicyId, Policy>>,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, policy: Policy) {
        self.policies.lock().unwrap().insert(policy.id, policy);
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn get(&self, id: PolicyId) -> Result<Option<Policy>> {
        Ok(self.policies.lock().unwrap().get(&id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryCloudAccountStore {
    accounts: Mutex<HashMap<CloudAccountId, CloudAccount>>,
}

impl MemoryCloudAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: CloudAccount) {
        self.accounts.lock().unwrap().insert(account.id, account);
    }
}

#[async_trait]
impl CloudAccountStore for MemoryCloudAccountStore {
    async fn get(&self, id: CloudAccountId) -> Result<Option<CloudAccount>> {
        Ok(self.accounts.lock().unwrap().get(&id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryPolicyResultStore {
    results: Mutex<HashMap<PolicyId, PolicyResult>>,
}

impl MemoryPolicyResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self, id: PolicyId) -> Option<PolicyResult> {
        self.results.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.results.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PolicyResultStore for MemoryPolicyResultStore {
    async fn upsert(&self, result: &PolicyResult) -> Result<()> {
        self.results
            .lock()
            .unwrap()
            .insert(result.policy_id, result.clone());
        Ok(())
    }
}

/// Credential validator with a switchable verdict.
pub struct StaticCredentialValidator {
    valid: AtomicBool,
}

impl StaticCredentialValidator {
    pub fn new(valid: bool) -> Self {
        Self {
            valid: AtomicBool::new(valid),
        }
    }

    pub fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialValidator for StaticCredentialValidator {
    async fn validate(&self, _account: &CloudAccount) -> Result<bool> {
        Ok(self.valid.load(Ordering::SeqCst))
    }
}

/// Retention target backed by a list of record timestamps.
#[derive(Default)]
pub struct MemoryRetentionStore {
    records: Mutex<Vec<DateTime<Utc>>>,
}

impl MemoryRetentionStore {
    pub fn new(records: Vec<DateTime<Utc>>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn remaining(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl RetentionStore for MemoryRetentionStore {
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|ts| *ts >= cutoff);
        Ok((before - records.len()) as u64)
    }
}
