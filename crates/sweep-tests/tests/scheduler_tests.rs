//! Pipeline scheduler registration and reconciliation scenarios.

use std::sync::Arc;
use sweep_core::pipeline::ScheduleSpec;
use sweep_core::Error;
use sweep_cron::CronRegistry;
use sweep_orchestrator::{EngineConfig, Orchestrator, PolicyEngine};
use sweep_scheduler::PipelineScheduler;
use sweep_tests::fixtures;
use sweep_tests::memory::{
    MemoryCloudAccountStore, MemoryPipelineStore, MemoryPolicyResultStore, MemoryPolicyStore,
    StaticCredentialValidator,
};

struct Harness {
    registry: Arc<CronRegistry>,
    pipelines: Arc<MemoryPipelineStore>,
    scheduler: PipelineScheduler,
}

fn harness() -> Harness {
    sweep_tests::init_tracing();
    let pipelines = Arc::new(MemoryPipelineStore::new());
    let orchestrator = Arc::new(Orchestrator::new(
        pipelines.clone(),
        Arc::new(MemoryPolicyStore::new()),
        Arc::new(MemoryCloudAccountStore::new()),
        Arc::new(MemoryPolicyResultStore::new()),
        Arc::new(StaticCredentialValidator::new(true)),
        Arc::new(PolicyEngine::new(EngineConfig::default())),
    ));
    let registry = Arc::new(CronRegistry::new("pipelines"));
    let scheduler = PipelineScheduler::new(registry.clone(), pipelines.clone(), orchestrator);
    Harness {
        registry,
        pipelines,
        scheduler,
    }
}

#[tokio::test]
async fn test_add_registers_derived_expression() {
    let h = harness();
    let pipeline = fixtures::pipeline(vec![]);

    h.scheduler.add_pipeline_schedule(&pipeline).unwrap();

    let jobs = h.registry.list_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, pipeline.id.to_string());
    assert_eq!(jobs[0].expression, "0 0 * * *");
}

#[tokio::test]
async fn test_sunday_schedule_registers() {
    let h = harness();
    let mut pipeline = fixtures::pipeline(vec![]);
    // Standard cron: 0 = Sunday.
    pipeline.schedule = ScheduleSpec::new("0", "0", "*", "*", "0");

    h.scheduler.add_pipeline_schedule(&pipeline).unwrap();

    let jobs = h.registry.list_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].expression, "0 0 * * 0");
}

#[tokio::test]
async fn test_add_twice_is_surfaced_as_duplicate() {
    let h = harness();
    let pipeline = fixtures::pipeline(vec![]);

    h.scheduler.add_pipeline_schedule(&pipeline).unwrap();
    let err = h.scheduler.add_pipeline_schedule(&pipeline).unwrap_err();
    assert!(matches!(err, Error::DuplicateJob(_)));
    assert_eq!(h.registry.list_jobs().len(), 1);
}

#[tokio::test]
async fn test_update_takes_effect_for_next_fire() {
    let h = harness();
    let mut pipeline = fixtures::pipeline(vec![]);

    h.scheduler.add_pipeline_schedule(&pipeline).unwrap();
    pipeline.schedule = ScheduleSpec::new("30", "6", "*", "*", "1");
    h.scheduler.update_pipeline_schedule(&pipeline).unwrap();

    let jobs = h.registry.list_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].expression, "30 6 * * 1");
}

#[tokio::test]
async fn test_update_unscheduled_pipeline_adds() {
    let h = harness();
    let pipeline = fixtures::pipeline(vec![]);

    h.scheduler.update_pipeline_schedule(&pipeline).unwrap();
    assert_eq!(h.registry.list_jobs().len(), 1);
}

#[tokio::test]
async fn test_delete_removes_schedule() {
    let h = harness();
    let pipeline = fixtures::pipeline(vec![]);

    h.scheduler.add_pipeline_schedule(&pipeline).unwrap();
    h.scheduler.delete_pipeline_schedule(pipeline.id).unwrap();
    assert!(h.registry.list_jobs().is_empty());

    let err = h.scheduler.delete_pipeline_schedule(pipeline.id).unwrap_err();
    assert!(matches!(err, Error::JobNotFound(_)));
}

#[tokio::test]
async fn test_boot_reconciliation_tolerates_bad_pipelines() {
    let h = harness();

    let good = fixtures::pipeline(vec![]);
    let mut disabled = fixtures::pipeline(vec![]);
    disabled.enabled = false;
    let mut invalid = fixtures::pipeline(vec![]);
    invalid.schedule = ScheduleSpec::new("99", "0", "*", "*", "*");

    h.pipelines.insert(good.clone());
    h.pipelines.insert(disabled.clone());
    h.pipelines.insert(invalid);

    let scheduled = h.scheduler.schedule_all_enabled().await.unwrap();
    assert_eq!(scheduled, 1);

    let jobs = h.registry.list_jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, good.id.to_string());
}
