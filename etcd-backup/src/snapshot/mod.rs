//! Snapshot creation, upload, and retention.

pub mod cluster_state;
pub mod pipeline;
pub mod retention;
pub mod tool;
pub mod upload;

pub use cluster_state::{ClusterStateSource, Kubectl};
pub use pipeline::{CreatedSnapshot, CreationPipeline};
pub use retention::RetentionReport;
pub use tool::{Etcdctl, SnapshotTool, ToolOutput};
pub use upload::{upload_snapshot, UploadOutcome};
