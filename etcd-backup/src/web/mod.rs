pub mod server;
pub mod tls;

pub use server::{snapshot_router, SnapshotServer};
pub use tls::mutual_tls_config;
