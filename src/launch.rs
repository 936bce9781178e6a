//! Run sequencer.
//!
//! The container's entry behavior: run the compiled test harness to
//! completion, and only if it exits 0, run the server. A failing harness
//! means the server is never started and the sequencer exits with the
//! harness's status. A single boolean gate; no retries, no timeouts.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{error, info};

use crate::errors::LaunchError;

/// States of the sequencer. `Aborted` and `ServerExited` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    TestRunning,
    TestPassed,
    TestFailed { exit_code: i32 },
    ServerRunning,
    ServerExited { exit_code: i32 },
    Aborted { exit_code: i32 },
}

/// Final outcome of a sequencer run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Exit code to surface to the container's caller: the server's on
    /// the `ServerExited` path, the harness's on the `Aborted` path.
    pub exit_code: i32,
    /// Every state the sequencer passed through, in order.
    pub history: Vec<SequencerState>,
}

impl RunOutcome {
    pub fn terminal_state(&self) -> SequencerState {
        *self
            .history
            .last()
            .expect("sequencer history is never empty")
    }
}

/// Gates server launch on test-harness success.
pub struct RunSequencer {
    test_bin: PathBuf,
    server_bin: PathBuf,
    state: SequencerState,
    history: Vec<SequencerState>,
}

impl RunSequencer {
    pub fn new(test_bin: PathBuf, server_bin: PathBuf) -> Self {
        Self {
            test_bin,
            server_bin,
            state: SequencerState::Idle,
            history: vec![SequencerState::Idle],
        }
    }

    fn transition(&mut self, next: SequencerState) {
        info!(from = ?self.state, to = ?next, "Sequencer transition");
        self.state = next;
        self.history.push(next);
    }

    /// Run the gate: test harness to completion, then the server iff the
    /// harness exited 0.
    pub async fn run(mut self) -> Result<RunOutcome, LaunchError> {
        if !self.test_bin.exists() {
            return Err(LaunchError::ArtifactMissing {
                path: self.test_bin.clone(),
            });
        }

        self.transition(SequencerState::TestRunning);
        let test_code = wait_for(&self.test_bin).await?;

        if test_code != 0 {
            self.transition(SequencerState::TestFailed {
                exit_code: test_code,
            });
            self.transition(SequencerState::Aborted {
                exit_code: test_code,
            });
            error!(exit_code = test_code, "Test harness failed; server will not start");
            return Ok(RunOutcome {
                exit_code: test_code,
                history: self.history,
            });
        }

        self.transition(SequencerState::TestPassed);

        if !self.server_bin.exists() {
            return Err(LaunchError::ArtifactMissing {
                path: self.server_bin.clone(),
            });
        }

        self.transition(SequencerState::ServerRunning);
        let server_code = wait_for(&self.server_bin).await?;
        self.transition(SequencerState::ServerExited {
            exit_code: server_code,
        });

        Ok(RunOutcome {
            exit_code: server_code,
            history: self.history,
        })
    }
}

/// Run one process to completion and return its exit code. A child killed
/// by a signal reports no code and maps to 1.
async fn wait_for(bin: &Path) -> Result<i32, LaunchError> {
    info!(path = %bin.display(), "Running process");
    let status = Command::new(bin)
        .status()
        .await
        .map_err(|source| LaunchError::SpawnFailed {
            path: bin.to_path_buf(),
            source,
        })?;
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn create_script(dir: &Path, name: &str, content: &str) -> PathBuf {
        let script_path = dir.join(name);
        fs::write(&script_path, content).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&script_path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script_path, perms).unwrap();
        }
        script_path
    }

    /// Test harness script with the given exit code, plus a server script
    /// that records a marker file each time it is invoked.
    fn sequencer_with(dir: &Path, test_exit: i32) -> (RunSequencer, PathBuf) {
        let test_bin = create_script(dir, "test", &format!("#!/bin/sh\nexit {test_exit}\n"));
        let marker = dir.join("server-ran");
        let server_bin = create_script(
            dir,
            "server",
            &format!("#!/bin/sh\necho ran >> {}\nexit 0\n", marker.display()),
        );
        (RunSequencer::new(test_bin, server_bin), marker)
    }

    #[tokio::test]
    async fn test_passing_harness_starts_server_exactly_once() {
        let dir = tempdir().unwrap();
        let (sequencer, marker) = sequencer_with(dir.path(), 0);

        let outcome = sequencer.run().await.unwrap();

        assert_eq!(outcome.exit_code, 0);
        assert_eq!(
            outcome.terminal_state(),
            SequencerState::ServerExited { exit_code: 0 }
        );
        assert_eq!(fs::read_to_string(&marker).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn test_failing_harness_never_starts_server() {
        let dir = tempdir().unwrap();
        let (sequencer, marker) = sequencer_with(dir.path(), 1);

        let outcome = sequencer.run().await.unwrap();

        assert_eq!(outcome.exit_code, 1);
        assert_eq!(
            outcome.terminal_state(),
            SequencerState::Aborted { exit_code: 1 }
        );
        assert!(!marker.exists(), "server must never run after a failed harness");
    }

    #[tokio::test]
    async fn test_harness_exit_code_propagates() {
        let dir = tempdir().unwrap();
        let (sequencer, _) = sequencer_with(dir.path(), 42);

        let outcome = sequencer.run().await.unwrap();
        assert_eq!(outcome.exit_code, 42);
    }

    #[tokio::test]
    async fn test_server_exit_code_propagates() {
        let dir = tempdir().unwrap();
        let test_bin = create_script(dir.path(), "test", "#!/bin/sh\nexit 0\n");
        let server_bin = create_script(dir.path(), "server", "#!/bin/sh\nexit 7\n");

        let outcome = RunSequencer::new(test_bin, server_bin).run().await.unwrap();

        assert_eq!(outcome.exit_code, 7);
        assert_eq!(
            outcome.terminal_state(),
            SequencerState::ServerExited { exit_code: 7 }
        );
    }

    #[tokio::test]
    async fn test_state_history_on_success_path() {
        let dir = tempdir().unwrap();
        let (sequencer, _) = sequencer_with(dir.path(), 0);

        let outcome = sequencer.run().await.unwrap();

        assert_eq!(
            outcome.history,
            vec![
                SequencerState::Idle,
                SequencerState::TestRunning,
                SequencerState::TestPassed,
                SequencerState::ServerRunning,
                SequencerState::ServerExited { exit_code: 0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_state_history_on_failure_path() {
        let dir = tempdir().unwrap();
        let (sequencer, _) = sequencer_with(dir.path(), 3);

        let outcome = sequencer.run().await.unwrap();

        assert_eq!(
            outcome.history,
            vec![
                SequencerState::Idle,
                SequencerState::TestRunning,
                SequencerState::TestFailed { exit_code: 3 },
                SequencerState::Aborted { exit_code: 3 },
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_harness_artifact() {
        let dir = tempdir().unwrap();
        let sequencer = RunSequencer::new(
            dir.path().join("test"),
            dir.path().join("server"),
        );

        let err = sequencer.run().await.unwrap_err();
        assert!(matches!(err, LaunchError::ArtifactMissing { .. }));
    }

    #[tokio::test]
    async fn test_missing_server_artifact_after_passing_harness() {
        let dir = tempdir().unwrap();
        let test_bin = create_script(dir.path(), "test", "#!/bin/sh\nexit 0\n");

        let err = RunSequencer::new(test_bin, dir.path().join("server"))
            .run()
            .await
            .unwrap_err();

        match err {
            LaunchError::ArtifactMissing { path } => {
                assert!(path.ends_with("server"));
            }
            other => panic!("Expected ArtifactMissing, got {other:?}"),
        }
    }
}
