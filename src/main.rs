//! CLI entry point for pcms

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pcms::page::HandlerRegistry;

#[derive(Parser)]
#[command(name = "pcms")]
#[command(version)]
#[command(about = "A small CMS serving a directory tree of pages", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on (defaults to `port` from the site config)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (defaults to `listen` from the site config)
        #[arg(short, long)]
        ip: Option<String>,
    },

    /// Print a bcrypt hash for the `users` table
    Password {
        /// Password to hash
        plaintext: String,

        /// bcrypt cost factor
        #[arg(long, default_value_t = pcms::commands::password::DEFAULT_COST)]
        cost: u32,
    },

    /// Print the page tree
    Tree,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug { "pcms=debug,info" } else { "pcms=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };

    // Preprocessors and handlers are registered by applications embedding the library
    let registry = HandlerRegistry::new();

    match cli.command {
        Commands::Serve { port, ip } => {
            let site = pcms::Pcms::new(&base_dir)?;
            let port = port.unwrap_or(site.config.port);
            let ip = ip.unwrap_or_else(|| site.config.listen.clone());
            tracing::info!("Serving {:?}", site.paths.site_dir);
            pcms::server::start(&site, &registry, &ip, port).await?;
        }

        Commands::Password { plaintext, cost } => {
            pcms::commands::password::run(&plaintext, cost)?;
        }

        Commands::Tree => {
            let site = pcms::Pcms::new(&base_dir)?;
            pcms::commands::tree::run(&site, &registry)?;
        }

        Commands::Version => {
            println!("pcms version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
