//! Engine and port definitions for Autostep.
//!
//! This crate defines the run store port and the host platform port that
//! the infrastructure layer implements, the run ledger state machine, and
//! the workflow runner. It depends only on `autostep-types` and never on
//! `autostep-infra`.

pub mod host;
pub mod repository;
pub mod state;
pub mod workflow;
