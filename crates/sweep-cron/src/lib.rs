//! Generic cron-job registry.
//!
//! Maps caller-supplied string IDs to scheduled callbacks and drives them
//! from wall-clock time. Domain-specific schedulers (pipelines, retention
//! sweepers) are thin wrappers over this crate.

pub mod registry;
pub mod store;

pub use registry::{CronRegistry, Job, TaskInfo};
pub use store::RegistryStore;
