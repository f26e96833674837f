//! Record-level fallback orchestration.
//!
//! # Overview
//!
//! [`FallbackChain`] answers "find this one record's abstract" by walking
//! identifier sources and then the publisher page. [`Orchestrator`] scales
//! that to directories of batch files: per-file statistics, bounded fan-out
//! per record, and all-or-nothing persistence.

mod chain;
mod orchestrator;

pub use chain::FallbackChain;
pub use orchestrator::{Orchestrator, OrchestratorError};
