//! Named cron-job registry and ticking engine.

use chrono::Utc;
use cron::Schedule;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use sweep_core::{Error, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A scheduled callback. Each job owns its fully-bound closure; the
/// registry never passes runtime parameters.
pub type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Snapshot of one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub id: String,
    pub expression: String,
}

struct Entry {
    expression: String,
    schedule: Schedule,
    job: Job,
    ticker: Option<JoinHandle<()>>,
}

/// Mapping from job ID to a running scheduled job, guaranteeing ID
/// uniqueness.
///
/// The job map is mutex-guarded; fired callbacks run on their own spawned
/// tasks outside the lock, so registry mutation during a fire is safe but
/// a callback is not serialized against re-registration of its own ID.
pub struct CronRegistry {
    name: String,
    jobs: Mutex<HashMap<String, Entry>>,
    started: AtomicBool,
}

impl CronRegistry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            jobs: Mutex::new(HashMap::new()),
            started: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register `job` to fire whenever `expression` matches wall-clock
    /// time. Fails with [`Error::DuplicateJob`] if `id` is already
    /// present; the existing job is never replaced.
    pub fn add_job(&self, id: &str, expression: &str, job: Job) -> Result<()> {
        let schedule = parse_cron(expression)?;
        let mut jobs = self.jobs.lock().expect("cron registry lock poisoned");
        if jobs.contains_key(id) {
            return Err(Error::DuplicateJob(id.to_string()));
        }

        let ticker = if self.started.load(Ordering::SeqCst) {
            Some(spawn_ticker(
                self.name.clone(),
                id.to_string(),
                schedule.clone(),
                job.clone(),
            ))
        } else {
            None
        };

        debug!(registry = %self.name, job_id = %id, cron = %expression, "job registered");
        jobs.insert(
            id.to_string(),
            Entry {
                expression: expression.to_string(),
                schedule,
                job,
                ticker,
            },
        );
        Ok(())
    }

    /// Delete-then-add. An absent `id` is added as new rather than
    /// failing.
    pub fn update_job(&self, id: &str, expression: &str, job: Job) -> Result<()> {
        match self.delete_job(id) {
            Ok(()) | Err(Error::JobNotFound(_)) => {}
            Err(e) => return Err(e),
        }
        self.add_job(id, expression, job)
    }

    /// Cancel the job's ticker and remove the entry. Fails with
    /// [`Error::JobNotFound`] if absent; the job map is unchanged in that
    /// case.
    pub fn delete_job(&self, id: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().expect("cron registry lock poisoned");
        let entry = jobs
            .remove(id)
            .ok_or_else(|| Error::JobNotFound(id.to_string()))?;
        if let Some(ticker) = entry.ticker {
            ticker.abort();
        }
        debug!(registry = %self.name, job_id = %id, "job deleted");
        Ok(())
    }

    /// Snapshot of current registrations, in no particular order.
    pub fn list_jobs(&self) -> Vec<TaskInfo> {
        let jobs = self.jobs.lock().expect("cron registry lock poisoned");
        jobs.iter()
            .map(|(id, entry)| TaskInfo {
                id: id.clone(),
                expression: entry.expression.clone(),
            })
            .collect()
    }

    /// Start ticking. Idempotent; a second call has no effect.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut jobs = self.jobs.lock().expect("cron registry lock poisoned");
        for (id, entry) in jobs.iter_mut() {
            if entry.ticker.is_none() {
                entry.ticker = Some(spawn_ticker(
                    self.name.clone(),
                    id.clone(),
                    entry.schedule.clone(),
                    entry.job.clone(),
                ));
            }
        }
        info!(registry = %self.name, jobs = jobs.len(), "cron registry started");
    }

    /// Halt ticking. Cancels every ticker without waiting for in-flight
    /// callbacks; registrations are kept and resume on the next `start`.
    pub fn stop(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut jobs = self.jobs.lock().expect("cron registry lock poisoned");
        for entry in jobs.values_mut() {
            if let Some(ticker) = entry.ticker.take() {
                ticker.abort();
            }
        }
        info!(registry = %self.name, "cron registry stopped");
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().expect("cron registry lock poisoned").is_empty()
    }
}

impl Drop for CronRegistry {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Parse a cron expression, prepending a seconds field for standard
/// 5-field expressions (the `cron` crate wants 6 or 7 fields). Standard
/// cron numbers Sunday as day-of-week 0; the `cron` crate only accepts
/// 1-7, so a literal 0 is translated to 7.
fn parse_cron(expression: &str) -> Result<Schedule> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let normalized = if fields.len() == 5 {
        let day_of_week = if fields[4] == "0" { "7" } else { fields[4] };
        format!(
            "0 {} {} {} {} {}",
            fields[0], fields[1], fields[2], fields[3], day_of_week
        )
    } else {
        expression.to_string()
    };
    Schedule::from_str(&normalized).map_err(|e| Error::InvalidSchedule {
        expression: expression.to_string(),
        reason: e.to_string(),
    })
}

/// One background ticker per job: sleep until the next fire time, then
/// run the callback on its own task so the ticker (and the registry lock)
/// never waits on it.
fn spawn_ticker(registry: String, id: String, schedule: Schedule, job: Job) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let Some(next) = schedule.upcoming(Utc).next() else {
                warn!(registry = %registry, job_id = %id, "schedule has no future fire times");
                return;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            debug!(registry = %registry, job_id = %id, "firing scheduled job");
            tokio::spawn(job());
        }
    })
}
