//! Pipeline artifact status report.

use anyhow::Result;
use gantry::config::PipelineConfig;

pub fn cmd_status(config: &PipelineConfig) -> Result<()> {
    println!();
    println!("Gantry Pipeline Status");
    println!("======================");
    println!();

    let tool_path = config.tool.bin_dir().join(&config.tool.name);
    if tool_path.exists() {
        println!(
            "Toolchain: Installed ({} {} at {})",
            config.tool.name,
            config.tool.version,
            tool_path.display()
        );
    } else {
        println!("Toolchain: Missing (run 'gantry provision')");
    }

    let stage_root = config.stage_root();
    if stage_root.is_dir() {
        println!("Staged tree: Present at {}", stage_root.display());
    } else {
        println!("Staged tree: Absent (reclaimed after build, or never staged)");
    }

    for target in config.target_order() {
        let path = config.artifact_path(target);
        let state = if path.exists() {
            "Built"
        } else {
            "Missing (run 'gantry build')"
        };
        println!("Target '{target}': {state}");
    }

    println!();
    Ok(())
}
