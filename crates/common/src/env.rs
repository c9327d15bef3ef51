//! Environment/runtime helpers
//!
//! Sanity checks to ensure the snapshot directory exists at startup.

use std::path::Path;

use tracing::{info, warn};

/// Ensure the parent directory of `snapshot_path` exists, creating it when missing.
pub async fn ensure_snapshot_dir(snapshot_path: &str) -> anyhow::Result<()> {
    let parent = match Path::new(snapshot_path).parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Ok(()),
    };
    if tokio::fs::metadata(parent).await.is_ok() {
        return Ok(());
    }
    warn!(dir = %parent.display(), "snapshot directory not found; creating it");
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", parent.display()))?;
    info!(dir = %parent.display(), "snapshot directory created");
    Ok(())
}
