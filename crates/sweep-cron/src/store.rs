//! Named collection of independent cron registries.

use crate::registry::CronRegistry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Holds one [`CronRegistry`] per name, created lazily. Constructed once
/// at startup and passed by reference to whoever needs a registry; there
/// is no global lookup.
#[derive(Default)]
pub struct RegistryStore {
    registries: Mutex<HashMap<String, Arc<CronRegistry>>>,
}

impl RegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the registry for `name`, creating and starting it on first
    /// use.
    pub fn registry(&self, name: &str) -> Arc<CronRegistry> {
        let mut registries = self.registries.lock().expect("registry store lock poisoned");
        registries
            .entry(name.to_string())
            .or_insert_with(|| {
                let registry = Arc::new(CronRegistry::new(name));
                registry.start();
                registry
            })
            .clone()
    }

    /// Stop and drop the registry for `name`, if present.
    pub fn remove(&self, name: &str) {
        let mut registries = self.registries.lock().expect("registry store lock poisoned");
        if let Some(registry) = registries.remove(name) {
            registry.stop();
            info!(registry = %name, "registry removed");
        }
    }

    /// Cancel every registered job across all registries. Called once at
    /// process shutdown.
    pub fn stop_all(&self) {
        let registries = self.registries.lock().expect("registry store lock poisoned");
        for registry in registries.values() {
            registry.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_created_lazily_and_shared() {
        let store = RegistryStore::new();
        let a = store.registry("pipelines");
        let b = store.registry("pipelines");
        assert!(Arc::ptr_eq(&a, &b));

        let other = store.registry("retention");
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[tokio::test]
    async fn test_remove_drops_named_registry() {
        let store = RegistryStore::new();
        let first = store.registry("retention");
        store.remove("retention");
        let second = store.registry("retention");
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
