//! Core library components.
//!
//! The rotation protocol, the versioned secret store, the target adapters
//! and the audit trail. Everything here is usable as a library without the
//! CLI front-end.

pub mod adapter;
pub mod audit;
pub mod config;
pub mod coordinator;
pub mod phase;
pub mod stage;
pub mod store;
pub mod types;
pub mod version;
