use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use models::Customer;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// Serialize the record sequence as a JSON array, preserving order.
pub fn encode(records: &[Customer]) -> Result<Vec<u8>, ServiceError> {
    serde_json::to_vec_pretty(records).map_err(|e| ServiceError::Encode(e.to_string()))
}

/// Parse a JSON array of customer objects.
pub fn decode(bytes: &[u8]) -> Result<Vec<Customer>, ServiceError> {
    serde_json::from_slice(bytes).map_err(|e| ServiceError::MalformedSnapshot(e.to_string()))
}

/// Read the snapshot at `path`. A missing file is an empty store, not an error.
pub async fn load_file(path: impl AsRef<Path>) -> Result<Vec<Customer>, ServiceError> {
    let path = path.as_ref();
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "snapshot file absent; starting empty");
            return Ok(Vec::new());
        }
        Err(e) => return Err(ServiceError::io(path, e)),
    };
    decode(&bytes).map_err(|e| match e {
        ServiceError::MalformedSnapshot(msg) => {
            ServiceError::MalformedSnapshot(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

/// Replace the snapshot at `path` with `records`.
///
/// Writes `<path>.tmp`, fsyncs it, then renames it over `path`, so a failed
/// write leaves the previous snapshot intact.
pub async fn save_file(path: impl AsRef<Path>, records: &[Customer]) -> Result<(), ServiceError> {
    let path = path.as_ref();
    let data = encode(records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(|e| ServiceError::io(parent, e))?;
    }

    let tmp_path = temp_path_for(path);
    if let Err(e) = write_synced(&tmp_path, &data).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(ServiceError::io(path, e));
    }

    // directory fsync makes the rename durable; not supported everywhere
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = fs::File::open(parent).await {
            if let Err(e) = dir.sync_all().await {
                warn!(dir = %parent.display(), error = %e, "snapshot directory fsync failed");
            }
        }
    }
    Ok(())
}

/// Move an unreadable snapshot out of the way so a later save cannot overwrite it.
/// Picks the first free name among `<path>.corrupt`, `<path>.corrupt.1`, ...
pub async fn quarantine_file(path: impl AsRef<Path>) -> Result<PathBuf, ServiceError> {
    let path = path.as_ref();
    let mut target = suffixed(path, ".corrupt");
    let mut n = 1u32;
    while fs::try_exists(&target).await.map_err(|e| ServiceError::io(&target, e))? {
        target = suffixed(path, &format!(".corrupt.{n}"));
        n += 1;
    }
    fs::rename(path, &target).await.map_err(|e| ServiceError::io(path, e))?;
    Ok(target)
}

async fn write_synced(path: &Path, data: &[u8]) -> Result<(), ServiceError> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .await
        .map_err(|e| ServiceError::io(path, e))?;
    file.write_all(data).await.map_err(|e| ServiceError::io(path, e))?;
    file.sync_all().await.map_err(|e| ServiceError::io(path, e))?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    suffixed(path, ".tmp")
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
