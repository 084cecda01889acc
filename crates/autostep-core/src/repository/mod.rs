//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (autostep-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod run_store;

pub use run_store::{RunStore, RunStoreDyn};
