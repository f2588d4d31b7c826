//! Shared test fixtures
#![allow(dead_code)]

pub mod cluster_state;
pub mod memory_store;
pub mod snapshot_tool;
pub mod test_config;

pub use cluster_state::*;
pub use memory_store::*;
pub use snapshot_tool::*;
pub use test_config::*;
