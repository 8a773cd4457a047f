use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use tokio::{
    fs::{File, create_dir_all, remove_file, rename},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};

use crate::error::RooflineError;

/// Parses a real number the way a shell user would write it: decimal or
/// scientific notation, surrounding whitespace ignored.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

/// True for values that can sit on a logarithmic axis
pub fn is_log_plottable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Sibling temp path used while staging `path`, ie. `calibration.json.tmp`
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("output"));
    name.push(".tmp");
    path.with_file_name(name)
}

pub async fn ensure_parent_dir(path: &Path) -> Result<(), RooflineError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).await?;
    }
    Ok(())
}

/// A fully written and synced temp file waiting to replace its destination.
#[derive(Debug)]
pub struct StagedWrite {
    staged: PathBuf,
    dest: PathBuf,
}

impl StagedWrite {
    /// Renames the staged file onto the destination, replacing any old file
    pub async fn commit(self) -> Result<PathBuf, RooflineError> {
        if let Err(err) = rename(&self.staged, &self.dest).await {
            warn!("Rename {:?} -> {:?} failed", self.staged, self.dest);
            _ = remove_file(&self.staged).await;
            return Err(err.into());
        }
        debug!("Committed {:?}", self.dest);
        Ok(self.dest)
    }
}

/// Writes `contents` next to `dest` without touching `dest` itself
pub async fn stage_write(dest: &Path, contents: &[u8]) -> Result<StagedWrite, RooflineError> {
    let staged = staging_path(dest);
    let result: Result<(), std::io::Error> = async {
        let mut file = File::create(&staged).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
    .await;

    if let Err(err) = result {
        _ = remove_file(&staged).await;
        return Err(err.into());
    }
    debug!("Staged {} bytes at {staged:?}", contents.len());
    Ok(StagedWrite {
        staged,
        dest: dest.to_path_buf(),
    })
}

/// Replaces `dest` with `contents` so readers only ever see a complete file
pub async fn write_atomic(dest: &Path, contents: &[u8]) -> Result<PathBuf, RooflineError> {
    ensure_parent_dir(dest).await?;
    stage_write(dest, contents).await?.commit().await
}
