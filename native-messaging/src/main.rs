//! Native messaging host binary entry point.
//!
//! The browser launches this binary and talks to it over stdin/stdout, so
//! stdout carries protocol frames only. All logging goes to stderr.

use clap::Parser;
use docstore_native_messaging::{run_host, NativeMessagingConfig};
use std::path::PathBuf;
use storage::DocumentStore;
use tracing_subscriber::EnvFilter;

/// Command line arguments for the native messaging host
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable development mode with additional logging
    #[arg(short, long)]
    dev: bool,

    /// Store root directory
    #[arg(long, env = "DOCSTORE_ROOT")]
    root: Option<PathBuf>,

    /// Browsers pass the caller's origin (and on Windows a parent window handle)
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    origin: Vec<String>,
}

fn load_config(args: &Args) -> anyhow::Result<NativeMessagingConfig> {
    let mut config = match &args.config {
        Some(path) => NativeMessagingConfig::from_file(path)?,
        None => NativeMessagingConfig::default(),
    };

    if let Some(level) = &args.log_level {
        config.log_level = level.to_lowercase();
    }
    if args.dev {
        config.dev_mode = true;
    }
    if let Some(root) = &args.root {
        config.store.root = Some(root.clone());
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(config: &NativeMessagingConfig) {
    let level = if !config.enable_logging {
        "off"
    } else if config.dev_mode {
        "debug"
    } else {
        config.log_level.as_str()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(&config);

    tracing::info!(
        log_level = %config.log_level,
        dev_mode = config.dev_mode,
        config_file = ?args.config,
        "Docstore native messaging host starting"
    );
    if !args.origin.is_empty() {
        tracing::debug!(origin = ?args.origin, "Launched by browser");
    }

    let store = DocumentStore::open(config.store.to_store_config()).await?;
    tracing::info!(root = %store.root().display(), "Document store opened");

    run_host(store, config).await
}
