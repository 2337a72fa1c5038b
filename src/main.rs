use anyhow::Result;
use clap::{Parser, Subcommand};

use perfmon::commands::{self, RunArgs};

#[derive(Parser)]
#[command(
    name = "perfmon",
    about = "Poll metrics concurrently and report live statistics",
    disable_version_flag = true
)]
struct Cli {
    /// Print version information
    #[arg(short = 'v', long = "version")]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a monitoring session (default)
    Run(RunArgs),
    /// Show version information
    Version,
}

fn main() -> Result<()> {
    perfmon::init_logging();

    let cli = Cli::parse();
    if cli.version {
        return commands::version();
    }

    match cli.command {
        Some(Commands::Run(args)) => commands::run(&args),
        Some(Commands::Version) => commands::version(),
        None => commands::run(&RunArgs::default()),
    }
}
