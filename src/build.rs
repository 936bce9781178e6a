//! Build orchestrator.
//!
//! Stage 3 of the pipeline: run the build-system generator exactly once
//! inside the staged tree, then compile each named target sequentially in
//! deterministic order (test harness first, then server). Artifacts land
//! in the shared output directory two levels above the staged tree; the
//! staged tree is reclaimed afterwards to keep the final image minimal.
//!
//! If the generator fails, no compile is attempted. Compiles are
//! fail-fast: a failed target stops the stage before later targets run.

use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::errors::BuildError;

/// A named compilation unit. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildTarget {
    pub name: String,
    pub output_dir: PathBuf,
    pub configuration: String,
}

/// The compiled artifact for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltArtifact {
    pub target: String,
    pub path: PathBuf,
}

/// Drives the external generator and compiler.
pub struct BuildOrchestrator {
    generator: String,
    generator_args: Vec<String>,
    compiler: String,
    configuration: String,
    cleanup_on_failure: bool,
}

impl BuildOrchestrator {
    pub fn new(
        generator: String,
        generator_args: Vec<String>,
        compiler: String,
        configuration: String,
        cleanup_on_failure: bool,
    ) -> Self {
        Self {
            generator,
            generator_args,
            compiler,
            configuration,
            cleanup_on_failure,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.generator_cmd(),
            config.build.generator_args.clone(),
            config.build.compiler.clone(),
            config.build.configuration.clone(),
            config.build.cleanup_on_failure,
        )
    }

    /// Run the full build stage: generate once, compile every target in
    /// order, then reclaim the staged tree.
    pub async fn build(
        &self,
        staged_root: &Path,
        targets: &[&str],
        output_dir: &Path,
    ) -> Result<Vec<BuiltArtifact>, BuildError> {
        if !staged_root.is_dir() {
            return Err(BuildError::NotStaged {
                path: staged_root.to_path_buf(),
            });
        }

        if let Err(err) = self.run_generator(staged_root).await {
            self.reclaim_on_failure(staged_root);
            return Err(err);
        }

        let mut artifacts = Vec::with_capacity(targets.len());
        for name in targets {
            let target = BuildTarget {
                name: (*name).to_string(),
                output_dir: output_dir.to_path_buf(),
                configuration: self.configuration.clone(),
            };
            match self.compile(staged_root, &target).await {
                Ok(artifact) => artifacts.push(artifact),
                Err(err) => {
                    self.reclaim_on_failure(staged_root);
                    return Err(err);
                }
            }
        }

        // Success path: the staged tree and generator intermediates must
        // not outlive the build stage.
        std::fs::remove_dir_all(staged_root).map_err(|source| BuildError::CleanupFailed {
            path: staged_root.to_path_buf(),
            source,
        })?;
        remove_scaffold(staged_root);
        info!(path = %staged_root.display(), "Staged tree reclaimed");

        Ok(artifacts)
    }

    /// Invoke the build-system generator once in the staged tree.
    async fn run_generator(&self, staged_root: &Path) -> Result<(), BuildError> {
        info!(command = %self.generator, args = ?self.generator_args, "Running generator");

        let status = Command::new(&self.generator)
            .args(&self.generator_args)
            .current_dir(staged_root)
            .status()
            .await
            .map_err(|source| BuildError::SpawnFailed {
                command: self.generator.clone(),
                source,
            })?;

        if !status.success() {
            return Err(BuildError::GeneratorFailed {
                command: self.generator.clone(),
                exit_code: status.code().unwrap_or(-1),
            });
        }

        Ok(())
    }

    /// Compile a single target with the Release-style configuration.
    async fn compile(
        &self,
        staged_root: &Path,
        target: &BuildTarget,
    ) -> Result<BuiltArtifact, BuildError> {
        info!(target = %target.name, configuration = %target.configuration, "Compiling target");

        let status = Command::new(&self.compiler)
            .arg(format!("config={}", target.configuration.to_lowercase()))
            .arg(&target.name)
            .current_dir(staged_root)
            .status()
            .await
            .map_err(|source| BuildError::SpawnFailed {
                command: self.compiler.clone(),
                source,
            })?;

        if !status.success() {
            return Err(BuildError::CompileFailed {
                target: target.name.clone(),
                exit_code: status.code().unwrap_or(-1),
            });
        }

        Ok(BuiltArtifact {
            target: target.name.clone(),
            path: target.output_dir.join(&target.name),
        })
    }

    /// Best-effort reclamation of the staged tree after a failed generate
    /// or compile. Never masks the primary build error.
    fn reclaim_on_failure(&self, staged_root: &Path) {
        if !self.cleanup_on_failure {
            info!(path = %staged_root.display(), "Leaving staged tree in place for inspection");
            return;
        }
        match std::fs::remove_dir_all(staged_root) {
            Ok(()) => remove_scaffold(staged_root),
            Err(err) => {
                warn!(path = %staged_root.display(), error = %err, "Failed to reclaim staged tree")
            }
        }
    }
}

/// Drop the directory that existed only to hold the staged tree.
/// `remove_dir` refuses non-empty directories, so a parent holding
/// anything else survives untouched.
fn remove_scaffold(staged_root: &Path) {
    if let Some(parent) = staged_root.parent() {
        let _ = std::fs::remove_dir(parent);
    }
}
