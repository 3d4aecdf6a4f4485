//! sweepd Core
//!
//! Core domain types, traits, and error handling for sweepd.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used across all other crates.

pub mod error;
pub mod ids;
pub mod pipeline;
pub mod policy;
pub mod ports;

pub use error::{Error, Result};
pub use ids::*;
