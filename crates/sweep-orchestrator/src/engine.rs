//! External policy engine invocation.
//!
//! Each execution gets an isolated working directory holding the policy
//! document in the engine's declarative YAML format. The engine is run as
//! a child process with the account's credentials in its environment, and
//! its combined stdout/stderr is delivered back over a one-shot channel.

use crate::config::EngineConfig;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use sweep_core::policy::{CloudAccount, Policy};
use sweep_core::{Error, Result};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

/// Name of the policy file materialized into the working directory.
pub const POLICY_FILE: &str = "policy.yml";

/// Name of the per-policy result file the engine writes on completion.
pub const RESOURCES_FILE: &str = "resources.json";

/// Runs policy documents through the external engine.
pub struct PolicyEngine {
    config: EngineConfig,
}

impl PolicyEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Create an isolated working directory for one policy execution and
    /// materialize the stored document into the engine's input format.
    ///
    /// The directory name carries a random suffix so concurrent runs of
    /// different pipelines never collide.
    pub fn prepare_workdir(&self, policy: &Policy) -> Result<PathBuf> {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let workdir = self
            .config
            .workdir_root
            .join(format!("{}.{}", policy.id, suffix));
        std::fs::create_dir_all(&workdir)?;

        // Stored documents are JSON; the engine wants YAML.
        let value: serde_json::Value = serde_json::from_str(&policy.document)
            .map_err(|e| Error::Serialization(format!("policy document is not JSON: {e}")))?;
        let yaml = serde_yaml::to_string(&value)
            .map_err(|e| Error::Serialization(format!("policy document to YAML: {e}")))?;
        std::fs::write(workdir.join(POLICY_FILE), yaml)?;

        debug!(policy_id = %policy.id, workdir = %workdir.display(), "working directory prepared");
        Ok(workdir)
    }

    /// Invoke the engine in `workdir` and wait for its combined output.
    pub async fn run(
        &self,
        workdir: &Path,
        account: &CloudAccount,
        region: &str,
    ) -> Result<String> {
        let prefix = account.provider.env_prefix();

        info!(
            command = %self.config.command,
            workdir = %workdir.display(),
            region = %region,
            "invoking policy engine"
        );

        let child = Command::new(&self.config.command)
            .args(&self.config.args)
            .arg(POLICY_FILE)
            .current_dir(workdir)
            .env(format!("{prefix}_DEFAULT_REGION"), region)
            .env(format!("{prefix}_ACCESS_KEY_ID"), &account.access_key)
            .env(format!("{prefix}_ACCESS_SECRET"), &account.secret_key)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Execution(format!("failed to spawn policy engine: {e}")))?;

        let (tx, rx) = oneshot::channel();
        let collector = tokio::spawn(async move {
            let result = child.wait_with_output().await.map(|out| {
                let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
                combined.push_str(&String::from_utf8_lossy(&out.stderr));
                combined
            });
            let _ = tx.send(result);
        });

        let received = match self.config.timeout_seconds {
            Some(secs) => match timeout(Duration::from_secs(secs), rx).await {
                Ok(received) => received,
                Err(_) => {
                    warn!(timeout_secs = secs, "policy engine timed out, killing process");
                    // Dropping the collector's child kills the engine.
                    collector.abort();
                    return Err(Error::Execution("policy engine timed out".to_string()));
                }
            },
            None => rx.await,
        };

        received
            .map_err(|_| Error::Execution("policy engine task dropped".to_string()))?
            .map_err(|e| Error::Execution(format!("failed to collect engine output: {e}")))
    }

    /// Read the engine's per-policy resources file, stripping newlines so
    /// the payload stores as a single line.
    pub fn read_resources(&self, workdir: &Path, policy_name: &str) -> Result<String> {
        let path = workdir.join(policy_name).join(RESOURCES_FILE);
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "resources file missing");
            Error::Execution(format!("resources file {}: {e}", path.display()))
        })?;
        Ok(raw.replace(['\r', '\n'], ""))
    }
}
