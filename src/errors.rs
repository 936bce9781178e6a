//! Typed error hierarchy for the gantry pipeline.
//!
//! One enum per stage:
//! - `ProvisionError` — toolchain download, extraction, and install failures
//! - `StageError` — source tree staging failures
//! - `BuildError` — generator and compile failures
//! - `LaunchError` — run-sequencer failures at container start
//!
//! Every error is fatal to the pipeline; there is no retry at any stage.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the toolchain provisioner.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Failed to download {url}: {source}")]
    DownloadFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Download of {url} returned HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to read archive at {path}: {source}")]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save downloaded archive: {0}")]
    ArchiveWrite(#[source] std::io::Error),

    #[error("Failed to extract archive: {0}")]
    ExtractFailed(#[source] std::io::Error),

    #[error("Archive does not contain a '{name}' binary")]
    BinaryNotInArchive { name: String },

    #[error("Failed to install {name} to {path}: {source}")]
    InstallFailed {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the source stager.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Source tree not found at {path}")]
    SourceMissing { path: PathBuf },

    #[error("Failed to copy {path}: {source}")]
    CopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk source tree: {0}")]
    WalkFailed(#[source] walkdir::Error),

    #[error("Failed to refresh timestamp on {path}: {source}")]
    TouchFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the build orchestrator.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No staged source tree at {path}; run the stager first")]
    NotStaged { path: PathBuf },

    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Generator '{command}' exited with code {exit_code}")]
    GeneratorFailed { command: String, exit_code: i32 },

    #[error("Compile of target '{target}' exited with code {exit_code}")]
    CompileFailed { target: String, exit_code: i32 },

    #[error("Failed to remove staged tree at {path}: {source}")]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the run sequencer.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Build artifact missing at {path}; run the build first")]
    ArtifactMissing { path: PathBuf },

    #[error("Failed to spawn {path}: {source}")]
    SpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provision_error_binary_not_in_archive_names_binary() {
        let err = ProvisionError::BinaryNotInArchive {
            name: "premake5".to_string(),
        };
        assert!(err.to_string().contains("premake5"));
    }

    #[test]
    fn stage_error_source_missing_carries_path() {
        let path = PathBuf::from("/work/sources");
        let err = StageError::SourceMissing { path: path.clone() };
        match &err {
            StageError::SourceMissing { path: p } => assert_eq!(p, &path),
            _ => panic!("Expected SourceMissing"),
        }
    }

    #[test]
    fn build_error_compile_failed_carries_target_and_code() {
        let err = BuildError::CompileFailed {
            target: "server".to_string(),
            exit_code: 2,
        };
        match &err {
            BuildError::CompileFailed { target, exit_code } => {
                assert_eq!(target, "server");
                assert_eq!(*exit_code, 2);
            }
            _ => panic!("Expected CompileFailed"),
        }
        assert!(err.to_string().contains("server"));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn launch_error_spawn_failed_is_matchable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = LaunchError::SpawnFailed {
            path: PathBuf::from("/app/test"),
            source: io_err,
        };
        match &err {
            LaunchError::SpawnFailed { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected SpawnFailed"),
        }
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&StageError::SourceMissing {
            path: PathBuf::from("/x"),
        });
        assert_std_error(&BuildError::GeneratorFailed {
            command: "premake5".into(),
            exit_code: 1,
        });
        assert_std_error(&LaunchError::ArtifactMissing {
            path: PathBuf::from("/x"),
        });
    }
}
