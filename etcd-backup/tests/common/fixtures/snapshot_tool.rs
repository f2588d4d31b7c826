use async_trait::async_trait;
use etcd_backup::snapshot::{SnapshotTool, ToolOutput};
use etcd_backup::Result;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

/// In-memory stand-in for etcdctl
#[derive(Default)]
pub struct FakeSnapshotTool {
    unhealthy_checks: AtomicU32,
    failing_saves: AtomicU32,
    pub health_calls: AtomicU32,
    pub save_calls: AtomicU32,
}

impl FakeSnapshotTool {
    pub fn healthy() -> Self {
        Self::default()
    }

    /// Report unhealthy for the first `n` health checks
    pub fn unhealthy_for(n: u32) -> Self {
        let tool = Self::default();
        tool.unhealthy_checks.store(n, Ordering::SeqCst);
        tool
    }

    /// Exit non-zero for the first `n` saves
    pub fn failing_saves(n: u32) -> Self {
        let tool = Self::default();
        tool.failing_saves.store(n, Ordering::SeqCst);
        tool
    }

    pub fn saves(&self) -> u32 {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn health_checks(&self) -> u32 {
        self.health_calls.load(Ordering::SeqCst)
    }
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl SnapshotTool for FakeSnapshotTool {
    async fn health(&self) -> Result<ToolOutput> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.unhealthy_checks) {
            // etcdctl exits zero for some unhealthy members, so only the text matters
            return Ok(ToolOutput {
                success: true,
                output: "127.0.0.1:2379 is unhealthy: failed to commit proposal".to_string(),
            });
        }
        Ok(ToolOutput {
            success: true,
            output: "127.0.0.1:2379 is healthy: successfully committed proposal".to_string(),
        })
    }

    async fn save(&self, destination: &Path) -> Result<ToolOutput> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.failing_saves) {
            return Ok(ToolOutput {
                success: false,
                output: "Error: context deadline exceeded".to_string(),
            });
        }
        let name = destination.file_name().unwrap().to_string_lossy();
        tokio::fs::write(destination, format!("snapshot-of-{}", name))
            .await
            .unwrap();
        Ok(ToolOutput {
            success: true,
            output: format!("Snapshot saved at {}", destination.display()),
        })
    }
}
