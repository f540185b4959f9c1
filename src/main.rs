use clap::{Parser, Subcommand};
use proofsheet::config::{self, DEFAULT_CONFIG_FILE};
use proofsheet::coordinator::{RequestCoordinator, Variant};
use proofsheet::{http, warm};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proofsheet")]
#[command(about = "On-demand thumbnail server for a photo directory")]
#[command(long_about = "\
On-demand thumbnail server for a photo directory

Serves resized JPEG derivatives of the images under base_dir, generating
each one on first request and caching it on disk. Concurrent requests for
the same derivative share a single generation.

Routes:

  /thumb/{path}      square thumbnail (thumb_size, default 100)
  /small/{path}      fit-within preview (view_size, default 480)
  /original/{path}   the source file
  /view/{path}       single-image page
  /gallery/{path}    directory page

Cache files are never invalidated. After editing a source image, delete
its derivatives ('proofsheet key PATH' prints where they live) or the
whole cache directory.

Run 'proofsheet gen-config' to print the stock configuration.")]
#[command(version)]
struct Cli {
    /// Configuration file (.json or .toml); created with defaults if missing
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Listen address, overriding the config file
        #[arg(long)]
        listen: Option<String>,
    },
    /// Pre-generate thumb and small derivatives for a directory tree
    Warm {
        /// Directory relative to base_dir
        #[arg(default_value = "")]
        dir: String,
    },
    /// Print the cache file a request would use
    Key {
        /// Image path relative to base_dir
        path: String,
        #[arg(long, value_enum, default_value = "thumb")]
        variant: Variant,
    },
    /// Print the stock configuration as JSON
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let load_config = || Arc::new(config::load_or_init(&cli.config));

    match cli.command.unwrap_or(Command::Serve { listen: None }) {
        Command::Serve { listen } => {
            let config = load_config();
            let listen = listen.unwrap_or_else(|| config.listen.clone());
            http::serve(config, &listen)?;
        }
        Command::Warm { dir } => {
            let config = load_config();
            init_thread_pool(&config);
            let coordinator = RequestCoordinator::new(config)?;
            let report = warm::warm(&coordinator, &dir)?;
            println!("Warmed {} images", report.images);
            println!("Cache: {}", coordinator.cache().stats());
            if report.failed > 0 {
                return Err(format!("{} derivatives failed", report.failed).into());
            }
        }
        Command::Key { path, variant } => {
            let coordinator = RequestCoordinator::new(load_config())?;
            println!("{}", coordinator.cache_entry(variant, &path)?.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_json());
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise -v/-q pick the level.
fn init_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match (quiet, verbose) {
        (true, _) => EnvFilter::new("proofsheet=warn"),
        (false, 0) => EnvFilter::new("proofsheet=info"),
        (false, 1) => EnvFilter::new("proofsheet=debug"),
        (false, _) => EnvFilter::new("proofsheet=trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Size the global rayon pool used by `warm`.
fn init_thread_pool(config: &config::ServerConfig) {
    rayon::ThreadPoolBuilder::new()
        .num_threads(config::effective_workers(config))
        .build_global()
        .ok();
}
