//! Domain schedulers built on the generic cron registry.

pub mod scheduler;
pub mod sweeper;

pub use scheduler::PipelineScheduler;
pub use sweeper::SweeperSet;
