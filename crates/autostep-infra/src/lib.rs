//! Infrastructure layer for Autostep.
//!
//! Contains implementations of the ports defined in `autostep-core`: the
//! JSON file run store with its cross-process lock, the host platform
//! adapters, the data root layout and `config.toml` loading.

pub mod config;
pub mod host;
pub mod paths;
pub mod state;
