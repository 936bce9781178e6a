//! Source stager.
//!
//! Stage 2 of the pipeline: materialize the external project's source tree
//! in the build workspace, then refresh every file's modification time.
//! Copied trees keep their historical timestamps, and incremental build
//! tools skip targets whose sources look unchanged; touching everything
//! guarantees the generator sees a fully fresh tree and performs a
//! complete build.

use filetime::FileTime;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::errors::StageError;

/// A staged copy of the source tree, ready for the build orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedTree {
    pub root: PathBuf,
    pub files_copied: usize,
}

/// Copy the source tree at `source_dir` into `stage_root` and normalize
/// all file timestamps to now.
pub fn stage_sources(source_dir: &Path, stage_root: &Path) -> Result<StagedTree, StageError> {
    if !source_dir.is_dir() {
        return Err(StageError::SourceMissing {
            path: source_dir.to_path_buf(),
        });
    }

    info!(
        source = %source_dir.display(),
        dest = %stage_root.display(),
        "Staging source tree"
    );

    let files_copied = copy_tree(source_dir, stage_root)?;
    normalize_timestamps(stage_root)?;

    info!(files = files_copied, "Source tree staged");

    Ok(StagedTree {
        root: stage_root.to_path_buf(),
        files_copied,
    })
}

fn copy_tree(source_dir: &Path, stage_root: &Path) -> Result<usize, StageError> {
    let mut files_copied = 0;

    for entry in WalkDir::new(source_dir) {
        let entry = entry.map_err(StageError::WalkFailed)?;
        let rel = entry
            .path()
            .strip_prefix(source_dir)
            .expect("walkdir yields paths under its root");
        let dest = stage_root.join(rel);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).map_err(|source| StageError::CopyFailed {
                path: dest.clone(),
                source,
            })?;
        } else {
            std::fs::copy(entry.path(), &dest).map_err(|source| StageError::CopyFailed {
                path: entry.path().to_path_buf(),
                source,
            })?;
            files_copied += 1;
        }
    }

    Ok(files_copied)
}

/// Set every file's mtime under `root` to the current time.
pub fn normalize_timestamps(root: &Path) -> Result<(), StageError> {
    let now = FileTime::now();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(StageError::WalkFailed)?;
        if !entry.file_type().is_file() {
            continue;
        }
        filetime::set_file_mtime(entry.path(), now).map_err(|source| StageError::TouchFailed {
            path: entry.path().to_path_buf(),
            source,
        })?;
        debug!(path = %entry.path().display(), "Timestamp refreshed");
    }

    Ok(())
}
