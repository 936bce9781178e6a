//! Container entry command: the run sequencer.

use anyhow::{Context, Result};
use gantry::config::PipelineConfig;
use gantry::launch::{RunSequencer, SequencerState};

/// Run the gate and return the exit code to surface to the caller.
pub async fn cmd_launch(config: &PipelineConfig) -> Result<i32> {
    let sequencer = RunSequencer::new(
        config.artifact_path(&config.targets.test),
        config.artifact_path(&config.targets.server),
    );

    let outcome = sequencer.run().await.context("Run sequencer failed")?;

    match outcome.terminal_state() {
        SequencerState::ServerExited { exit_code } => {
            println!("Server exited with code {exit_code}");
        }
        SequencerState::Aborted { exit_code } => {
            println!(
                "{}",
                console::style(format!(
                    "Test harness failed with code {exit_code}; server not started"
                ))
                .red()
            );
        }
        _ => {}
    }

    Ok(outcome.exit_code)
}
