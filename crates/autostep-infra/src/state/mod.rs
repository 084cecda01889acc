//! Durable run state: the JSON file store and the cross-process lock.

pub mod json_store;
pub mod lock;

pub use json_store::JsonRunStore;
pub use lock::StoreLock;
