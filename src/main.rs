use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(version, about = "Build-test-launch pipeline driver")]
pub struct Cli {
    /// Path to the pipeline configuration file
    #[arg(long, default_value = "gantry.toml", global = true)]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download and install the pinned build toolchain
    Provision,
    /// Stage the source tree with freshened timestamps
    Stage,
    /// Generate build files and compile the test and server targets
    Build,
    /// Run provision, stage, and build in order (the image-build entry point)
    Assemble,
    /// Run the test harness and, only if it passes, the server (the
    /// container entry point)
    Launch,
    /// Report which pipeline artifacts currently exist
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = gantry::config::PipelineConfig::load_or_default(&cli.config)?;

    match &cli.command {
        Commands::Provision => cmd::cmd_provision(&config).await?,
        Commands::Stage => cmd::cmd_stage(&config)?,
        Commands::Build => cmd::cmd_build(&config).await?,
        Commands::Assemble => cmd::cmd_assemble(&config).await?,
        Commands::Launch => {
            // The sequencer's exit status is the container's exit status.
            let code = cmd::cmd_launch(&config).await?;
            std::process::exit(code);
        }
        Commands::Status => cmd::cmd_status(&config)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "gantry=debug" } else { "gantry=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
