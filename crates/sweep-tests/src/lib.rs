//! Test infrastructure for sweepd: in-memory port implementations and
//! entity fixtures shared by the integration tests.

pub mod fixtures;
pub mod memory;

/// Install a test subscriber once per process. Safe to call from every
/// test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
