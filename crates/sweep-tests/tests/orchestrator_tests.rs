//! End-to-end orchestrator scenarios with the policy engine stubbed by a
//! shell script.

use std::sync::Arc;
use sweep_core::pipeline::RunStatus;
use sweep_core::policy::PolicyResult;
use sweep_core::Error;
use sweep_orchestrator::{EngineConfig, Orchestrator, PolicyEngine};
use sweep_tests::fixtures;
use sweep_tests::memory::{
    MemoryCloudAccountStore, MemoryPipelineStore, MemoryPolicyResultStore, MemoryPolicyStore,
    StaticCredentialValidator,
};

/// Stub engine: fails policies whose document mentions `bad-policy`,
/// otherwise writes a resources file and logs a custodian-style line.
const ENGINE_SCRIPT: &str = r#"
if grep -q bad-policy policy.yml; then
  echo 'ERROR: policy execution failed'
else
  mkdir -p stop-idle
  printf '[{"InstanceId":"i-1"}]\n' > stop-idle/resources.json
  echo 'custodian.policy:INFO policy:stop-idle resource:ec2 region:us-east-1 count:1 time:0.1'
fi
"#;

struct Harness {
    pipelines: Arc<MemoryPipelineStore>,
    policies: Arc<MemoryPolicyStore>,
    accounts: Arc<MemoryCloudAccountStore>,
    results: Arc<MemoryPolicyResultStore>,
    validator: Arc<StaticCredentialValidator>,
    orchestrator: Arc<Orchestrator>,
    _workdir: tempfile::TempDir,
}

fn harness_with_script(script: &str) -> Harness {
    sweep_tests::init_tracing();
    let workdir = tempfile::tempdir().unwrap();
    let engine = Arc::new(PolicyEngine::new(EngineConfig {
        command: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        workdir_root: workdir.path().to_path_buf(),
        timeout_seconds: Some(30),
    }));

    let pipelines = Arc::new(MemoryPipelineStore::new());
    let policies = Arc::new(MemoryPolicyStore::new());
    let accounts = Arc::new(MemoryCloudAccountStore::new());
    let results = Arc::new(MemoryPolicyResultStore::new());
    let validator = Arc::new(StaticCredentialValidator::new(true));

    let orchestrator = Arc::new(Orchestrator::new(
        pipelines.clone(),
        policies.clone(),
        accounts.clone(),
        results.clone(),
        validator.clone(),
        engine,
    ));

    Harness {
        pipelines,
        policies,
        accounts,
        results,
        validator,
        orchestrator,
        _workdir: workdir,
    }
}

fn harness() -> Harness {
    harness_with_script(ENGINE_SCRIPT)
}

#[tokio::test]
async fn test_successful_run_completes_pipeline() {
    let h = harness();
    let account = fixtures::aws_account();
    let policy = fixtures::policy(account.id);
    let pipeline = fixtures::pipeline(vec![policy.id]);
    h.accounts.insert(account);
    h.policies.insert(policy.clone());
    h.pipelines.insert(pipeline.clone());

    let outcome = h
        .orchestrator
        .submit_run(pipeline.id)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(!outcome.skipped);
    assert_eq!(outcome.status, RunStatus::Completed);

    let result = h.results.result(policy.id).unwrap();
    assert_eq!(result.last_run_status, PolicyResult::STATUS_SUCCESS);
    assert_eq!(result.resource_type.as_deref(), Some("ec2"));
    assert_eq!(result.region_results.len(), 1);
    assert_eq!(result.region_results[0].region, "us-east-1");
    assert!(result.region_results[0].payload.contains("i-1"));
    assert!(!result.region_results[0].payload.contains('\n'));

    let stored = h.pipelines.pipeline(pipeline.id).unwrap();
    assert_eq!(stored.run_status, RunStatus::Completed);
    assert!(stored.last_run_time > 0);
}

#[tokio::test]
async fn test_failed_policy_marks_pipeline_failed() {
    let h = harness();
    let account = fixtures::aws_account();
    let bad = fixtures::bad_policy(account.id);
    let good = fixtures::policy(account.id);
    let pipeline = fixtures::pipeline(vec![bad.id, good.id]);
    h.accounts.insert(account);
    h.policies.insert(bad.clone());
    h.policies.insert(good.clone());
    h.pipelines.insert(pipeline.clone());

    let outcome = h
        .orchestrator
        .submit_run(pipeline.id)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(h.results.len(), 2);
    assert_eq!(h.results.result(bad.id).unwrap().last_run_status, "Internal Error");
    assert_eq!(
        h.results.result(good.id).unwrap().last_run_status,
        PolicyResult::STATUS_SUCCESS
    );
    assert_eq!(
        h.pipelines.pipeline(pipeline.id).unwrap().run_status,
        RunStatus::Failed
    );
}

#[tokio::test]
async fn test_missing_second_policy_is_recorded_not_fatal() {
    let h = harness();
    let account = fixtures::aws_account();
    let good = fixtures::policy(account.id);
    let ghost = fixtures::policy(account.id); // never inserted into the store
    let pipeline = fixtures::pipeline(vec![good.id, ghost.id]);
    h.accounts.insert(account);
    h.policies.insert(good.clone());
    h.pipelines.insert(pipeline.clone());

    let outcome = h
        .orchestrator
        .submit_run(pipeline.id)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(
        h.results.result(ghost.id).unwrap().last_run_status,
        "Policy Definition missing"
    );
    assert_eq!(
        h.results.result(good.id).unwrap().last_run_status,
        PolicyResult::STATUS_SUCCESS
    );
}

#[tokio::test]
async fn test_zero_policies_rejected_with_409() {
    let h = harness();
    let account = fixtures::aws_account();
    let pipeline = fixtures::pipeline(vec![]);
    h.accounts.insert(account);
    h.pipelines.insert(pipeline.clone());

    let err = h.orchestrator.submit_run(pipeline.id).await.unwrap_err();
    assert!(matches!(err, Error::NoPolicies));
    assert_eq!(err.http_status(), 409);

    // No state mutation.
    assert!(h.results.is_empty());
    let stored = h.pipelines.pipeline(pipeline.id).unwrap();
    assert_eq!(stored.run_status, RunStatus::Unknown);
    assert_eq!(h.pipelines.finish_calls(), 0);
}

#[tokio::test]
async fn test_unknown_pipeline_rejected_with_404() {
    let h = harness();
    let err = h
        .orchestrator
        .submit_run(sweep_core::ids::PipelineId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::PipelineNotFound(_)));
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn test_invalid_credentials_rejected_with_409() {
    let h = harness();
    let account = fixtures::aws_account();
    let policy = fixtures::policy(account.id);
    let pipeline = fixtures::pipeline(vec![policy.id]);
    h.accounts.insert(account);
    h.policies.insert(policy);
    h.pipelines.insert(pipeline.clone());
    h.validator.set_valid(false);

    let err = h.orchestrator.submit_run(pipeline.id).await.unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailed));
    assert_eq!(err.http_status(), 409);
    assert!(h.results.is_empty());
}

#[tokio::test]
async fn test_running_pipeline_is_suppressed() {
    let h = harness();
    let account = fixtures::aws_account();
    let policy = fixtures::policy(account.id);
    let mut pipeline = fixtures::pipeline(vec![policy.id]);
    pipeline.run_status = RunStatus::Running;
    h.accounts.insert(account);
    h.policies.insert(policy);
    h.pipelines.insert(pipeline.clone());

    let outcome = h
        .orchestrator
        .submit_run(pipeline.id)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(outcome.skipped);
    assert!(outcome.policy_outcomes.is_empty());
    assert!(h.results.is_empty());
    assert_eq!(h.pipelines.finish_calls(), 0);
    assert_eq!(
        h.pipelines.pipeline(pipeline.id).unwrap().run_status,
        RunStatus::Running
    );
}

#[tokio::test]
async fn test_rapid_double_submit_runs_once() {
    // Slow the engine down so the two submissions overlap.
    let script = format!("sleep 1\n{ENGINE_SCRIPT}");
    let h = harness_with_script(&script);
    let account = fixtures::aws_account();
    let policy = fixtures::policy(account.id);
    let pipeline = fixtures::pipeline(vec![policy.id]);
    h.accounts.insert(account);
    h.policies.insert(policy);
    h.pipelines.insert(pipeline.clone());

    let first = h.orchestrator.submit_run(pipeline.id).await.unwrap();
    let second = h.orchestrator.submit_run(pipeline.id).await.unwrap();

    let outcomes = [first.wait().await.unwrap(), second.wait().await.unwrap()];
    let executed = outcomes.iter().filter(|o| !o.skipped).count();
    assert_eq!(executed, 1);

    // Exactly one terminal transition.
    assert_eq!(h.pipelines.finish_calls(), 1);
    assert_eq!(
        h.pipelines.pipeline(pipeline.id).unwrap().run_status,
        RunStatus::Completed
    );
}
