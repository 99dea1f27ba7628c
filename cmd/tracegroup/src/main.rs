//! tracegroup - cluster stack traces by structural similarity.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod input;

use commands::{ClusterCommand, VocabCommand};

/// tracegroup - cluster stack traces by structural similarity.
///
/// Input files are JSON lines, one record per line, either
///   {"id": "...", "frames": ["pkg.Class.method", ...]}
/// or
///   {"id": "...", "log": "<raw error log with '\tat ...' lines>"}
#[derive(Parser)]
#[command(name = "tracegroup")]
#[command(about = "Cluster stack traces by structural similarity")]
#[command(version)]
pub struct Cli {
    /// Clustering config file (YAML)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON instead of YAML
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cluster the traces of a file
    Cluster(ClusterCommand),
    /// Build a vocabulary and print its statistics
    Vocab(VocabCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Cluster(cmd) => cmd.run(&cli),
        Commands::Vocab(cmd) => cmd.run(&cli),
    }
}
