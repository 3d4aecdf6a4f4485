//! Pipeline schedule registration.
//!
//! Translates pipelines into cron registry entries keyed by pipeline ID
//! and keeps them synchronized with persisted state. A pipeline's
//! schedule is either registered or not; disabling a pipeline must delete
//! its entry.

use std::sync::Arc;
use sweep_core::ids::PipelineId;
use sweep_core::pipeline::Pipeline;
use sweep_core::ports::PipelineStore;
use sweep_core::Result;
use sweep_cron::{CronRegistry, Job};
use sweep_orchestrator::Orchestrator;
use tracing::{info, warn};

pub struct PipelineScheduler {
    registry: Arc<CronRegistry>,
    pipelines: Arc<dyn PipelineStore>,
    orchestrator: Arc<Orchestrator>,
}

impl PipelineScheduler {
    pub fn new(
        registry: Arc<CronRegistry>,
        pipelines: Arc<dyn PipelineStore>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            registry,
            pipelines,
            orchestrator,
        }
    }

    /// Register a cron entry firing `submit_run` for this pipeline.
    ///
    /// Fails with [`sweep_core::Error::DuplicateJob`] if the pipeline is
    /// already scheduled; boot-time re-registration tolerates that at the
    /// call site.
    pub fn add_pipeline_schedule(&self, pipeline: &Pipeline) -> Result<()> {
        pipeline.schedule.validate()?;
        let expression = pipeline.schedule.to_cron_expression();
        self.registry
            .add_job(&pipeline.id.to_string(), &expression, self.run_job(pipeline.id))?;
        info!(pipeline_id = %pipeline.id, cron = %expression, "pipeline scheduled");
        Ok(())
    }

    /// Delete-then-add, so schedule changes take effect for the next
    /// fire. A previously unscheduled pipeline is simply added.
    pub fn update_pipeline_schedule(&self, pipeline: &Pipeline) -> Result<()> {
        pipeline.schedule.validate()?;
        let expression = pipeline.schedule.to_cron_expression();
        self.registry
            .update_job(&pipeline.id.to_string(), &expression, self.run_job(pipeline.id))?;
        info!(pipeline_id = %pipeline.id, cron = %expression, "pipeline schedule updated");
        Ok(())
    }

    /// Remove the cron entry. An in-flight run is unaffected.
    pub fn delete_pipeline_schedule(&self, id: PipelineId) -> Result<()> {
        self.registry.delete_job(&id.to_string())?;
        info!(pipeline_id = %id, "pipeline unscheduled");
        Ok(())
    }

    /// Boot-time reconciliation: register every enabled pipeline from the
    /// store. Individual failures are logged and do not abort the loop;
    /// returns the number scheduled.
    pub async fn schedule_all_enabled(&self) -> Result<usize> {
        let pipelines = self.pipelines.list_enabled().await?;
        let mut scheduled = 0;
        for pipeline in &pipelines {
            match self.add_pipeline_schedule(pipeline) {
                Ok(()) => scheduled += 1,
                Err(e) => {
                    warn!(pipeline_id = %pipeline.id, error = %e, "failed to schedule pipeline")
                }
            }
        }
        info!(scheduled, total = pipelines.len(), "enabled pipelines scheduled");
        Ok(scheduled)
    }

    /// Fully-bound job closure for one pipeline. Scheduled fires drop the
    /// run handle; outcomes are discoverable from persisted state.
    fn run_job(&self, id: PipelineId) -> Job {
        let orchestrator = self.orchestrator.clone();
        Arc::new(move || {
            let orchestrator = orchestrator.clone();
            Box::pin(async move {
                match orchestrator.submit_run(id).await {
                    Ok(_handle) => {}
                    Err(e) => warn!(pipeline_id = %id, error = %e, "scheduled run rejected"),
                }
            })
        })
    }
}
