//! Portico CLI: the main entry point.
//!
//! Commands:
//! - `serve`: Start the UI gateway
//! - `check`: Validate a page template's injection markers
//! - `preview`: Compose the page for a user and print it
//! - `hash-password`: Print the digest to put in `auth.users`
//! - `init`: Create `~/.portico/` and a default config
//! - `doctor`: Diagnose configuration and template

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "portico",
    about = "Portico: session-aware UI front door",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the UI gateway
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate a page template (defaults to the configured one)
    Check {
        /// Template file to check
        #[arg(short, long)]
        template: Option<PathBuf>,
    },

    /// Compose the index page for a user and write it to stdout
    Preview {
        /// Principal to render the page for
        #[arg(short, long)]
        user: String,

        /// Template file to use instead of the configured one
        #[arg(short, long)]
        template: Option<PathBuf>,
    },

    /// Print the SHA-256 digest of a password for `auth.users`
    HashPassword {
        password: String,
    },

    /// Initialize configuration directory and default config
    Init,

    /// Diagnose configuration and template
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Check { template } => commands::check::run(template).await?,
        Commands::Preview { user, template } => commands::preview::run(&user, template).await?,
        Commands::HashPassword { password } => commands::hash_password::run(&password),
        Commands::Init => commands::init::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
