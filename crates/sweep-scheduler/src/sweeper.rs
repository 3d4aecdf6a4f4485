//! Periodic retention sweepers.
//!
//! Generic age-based deletion jobs (cost cache, recommendation cache)
//! sharing one named registry from the store.

use chrono::{Duration, Utc};
use std::sync::Arc;
use sweep_core::ports::RetentionStore;
use sweep_core::Result;
use sweep_cron::RegistryStore;
use tracing::{info, warn};

pub struct SweeperSet {
    registries: Arc<RegistryStore>,
    registry_name: String,
}

impl SweeperSet {
    pub fn new(registries: Arc<RegistryStore>, registry_name: impl Into<String>) -> Self {
        Self {
            registries,
            registry_name: registry_name.into(),
        }
    }

    /// Register a sweeper that, on every fire, deletes records in
    /// `target` older than `max_age`.
    pub fn start_sweeper(
        &self,
        name: &str,
        cron_expression: &str,
        max_age: Duration,
        target: Arc<dyn RetentionStore>,
    ) -> Result<()> {
        let registry = self.registries.registry(&self.registry_name);
        let sweeper = name.to_string();
        registry.add_job(
            name,
            cron_expression,
            Arc::new(move || {
                let target = target.clone();
                let sweeper = sweeper.clone();
                Box::pin(async move {
                    let cutoff = Utc::now() - max_age;
                    match target.delete_older_than(cutoff).await {
                        Ok(deleted) => {
                            info!(sweeper = %sweeper, %cutoff, deleted, "retention sweep done")
                        }
                        Err(e) => warn!(sweeper = %sweeper, error = %e, "retention sweep failed"),
                    }
                })
            }),
        )?;
        info!(sweeper = %name, cron = %cron_expression, "retention sweeper started");
        Ok(())
    }

    /// Delete the sweeper's cron entry; the named registry itself is
    /// dropped once the last sweeper is gone.
    pub fn stop_sweeper(&self, name: &str) -> Result<()> {
        let registry = self.registries.registry(&self.registry_name);
        registry.delete_job(name)?;
        if registry.is_empty() {
            self.registries.remove(&self.registry_name);
        }
        info!(sweeper = %name, "retention sweeper stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        sweeps: AtomicUsize,
    }

    #[async_trait]
    impl RetentionStore for CountingStore {
        async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64> {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            Ok(3)
        }
    }

    #[tokio::test]
    async fn test_sweeper_fires_and_deletes() {
        let registries = Arc::new(RegistryStore::new());
        let set = SweeperSet::new(registries.clone(), "retention");
        let store = Arc::new(CountingStore {
            sweeps: AtomicUsize::new(0),
        });

        // Seconds-granularity schedule so the test observes a fire.
        set.start_sweeper("cost", "* * * * * *", Duration::days(30), store.clone())
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
        set.stop_sweeper("cost").unwrap();

        assert!(store.sweeps.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_duplicate_sweeper_name_rejected() {
        let registries = Arc::new(RegistryStore::new());
        let set = SweeperSet::new(registries, "retention");
        let store = Arc::new(CountingStore {
            sweeps: AtomicUsize::new(0),
        });

        set.start_sweeper("cost", "0 3 * * *", Duration::days(30), store.clone())
            .unwrap();
        assert!(
            set.start_sweeper("cost", "0 4 * * *", Duration::days(7), store)
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_stopping_last_sweeper_removes_registry() {
        let registries = Arc::new(RegistryStore::new());
        let set = SweeperSet::new(registries.clone(), "retention");
        let store = Arc::new(CountingStore {
            sweeps: AtomicUsize::new(0),
        });

        set.start_sweeper("cost", "0 3 * * *", Duration::days(30), store.clone())
            .unwrap();
        set.start_sweeper("recommendations", "0 4 * * *", Duration::days(30), store)
            .unwrap();

        set.stop_sweeper("cost").unwrap();
        // Registry survives while a sweeper remains.
        assert_eq!(registries.registry("retention").list_jobs().len(), 1);

        set.stop_sweeper("recommendations").unwrap();
        assert!(registries.registry("retention").list_jobs().is_empty());
    }
}
