//! Image-build commands: provision, stage, build, and the assemble
//! composite that runs them in pipeline order.

use anyhow::{Context, Result};
use gantry::build::BuildOrchestrator;
use gantry::config::PipelineConfig;
use gantry::provision::provision;
use gantry::stage::stage_sources;

pub async fn cmd_provision(config: &PipelineConfig) -> Result<()> {
    let binary = provision(&config.tool)
        .await
        .context("Toolchain provisioning failed")?;

    println!(
        "Installed {} {} at {}",
        binary.name,
        binary.version,
        binary.path.display()
    );
    Ok(())
}

pub fn cmd_stage(config: &PipelineConfig) -> Result<()> {
    let staged = stage_sources(&config.paths.source_dir, &config.stage_root())
        .context("Source staging failed")?;

    println!(
        "Staged {} files at {}",
        staged.files_copied,
        staged.root.display()
    );
    Ok(())
}

pub async fn cmd_build(config: &PipelineConfig) -> Result<()> {
    let orchestrator = BuildOrchestrator::from_config(config);
    let artifacts = orchestrator
        .build(
            &config.stage_root(),
            &config.target_order(),
            &config.output_dir(),
        )
        .await
        .context("Build failed")?;

    for artifact in &artifacts {
        println!(
            "Built target '{}' -> {}",
            artifact.target,
            artifact.path.display()
        );
    }
    Ok(())
}

/// Stages 1 -> 2 -> 3 in order. Any failure aborts immediately; later
/// stages are never attempted.
pub async fn cmd_assemble(config: &PipelineConfig) -> Result<()> {
    cmd_provision(config).await?;
    cmd_stage(config)?;
    cmd_build(config).await?;

    println!("{}", console::style("Pipeline assembly complete").green());
    Ok(())
}
