//! Snapshot lifecycle management for etcd: creation, archiving, dual-tier
//! retention, object-store upload, and peer transfer over mutual TLS.

pub mod archive;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod http;
pub mod naming;
pub mod operations;
pub mod scheduler;
pub mod services;
pub mod snapshot;
pub mod storage;
pub mod web;

pub use config::{BackupConfig, ConfigLoader};
pub use errors::{BackupError, Result};
