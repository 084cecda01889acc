//! Workflow engine: definitions, action dispatch and the sequential runner.
//!
//! - `definition` -- YAML/JSON parsing and structural validation
//! - `manifest` -- name-to-file lookup for installed workflows
//! - `action` -- action kinds, step outcomes, handler trait and context
//! - `dispatch` -- action registry routing steps to handlers
//! - `handlers` -- built-in handlers for every action kind
//! - `pattern` -- regex path matching with a literal search root
//! - `runner` -- checkpointed execution with reboot suspend/resume

pub mod action;
pub mod definition;
pub mod dispatch;
pub mod handlers;
pub mod manifest;
pub mod pattern;
pub mod runner;
