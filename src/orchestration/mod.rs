//! Run orchestration: source -> compile -> store.

pub mod orchestrator;

pub use orchestrator::{Orchestrator, RunSettings};
