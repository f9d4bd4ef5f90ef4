//! Pixshift CLI - concurrent batch image format conversion.
//!
//! Converts every image under a file or directory to one target format,
//! writing results flat into an output directory or mirroring the input tree.
//!
//! # Usage
//!
//! ```bash
//! # Convert a directory to WebP
//! pixshift convert ./photos --format webp --quality 80
//!
//! # Recurse and keep the directory layout
//! pixshift convert ./photos -f png -r -m -o ./out
//!
//! # List supported target formats
//! pixshift formats
//!
//! # View configuration
//! pixshift config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Pixshift - concurrent batch image format converter.
#[derive(Parser, Debug)]
#[command(name = "pixshift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert images to another format
    Convert(cli::convert::ConvertArgs),

    /// List supported target formats
    Formats,

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match pixshift_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `pixshift config path`."
            );
            pixshift_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("pixshift v{}", pixshift_core::VERSION);

    match cli.command {
        Commands::Convert(args) => cli::convert::execute(args, config).await,
        Commands::Formats => cli::formats::execute(),
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
