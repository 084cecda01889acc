//! Shared domain types for Autostep.
//!
//! This crate contains the types used across the workspace: workflow
//! definitions, run and step records, scalar parameter values, configuration,
//! and the store error type.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod error;
pub mod run;
pub mod value;
pub mod workflow;
