//! lazypane - open lazygit in a tmux split for the current repository
//!
//! Run with `lazypane` or `lazypane --help` for usage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lazypane::{
    config::{Config, SetupOptions},
    repo,
    tmux::{TmuxExecutor, TmuxHost},
    Error, SessionManager, APP_NAME, VERSION,
};

#[derive(Parser)]
#[command(name = APP_NAME)]
#[command(version = VERSION)]
#[command(about = "Open a git TUI in a tmux split for the repository you are standing in")]
#[command(long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the tool for a repository and wait until it exits (default)
    Open {
        /// Any path inside the repository (default: current directory)
        path: Option<PathBuf>,

        /// Ignore the last opened repository
        #[arg(long)]
        no_last: bool,

        /// Session scope: global or per-tab
        #[arg(long)]
        scope: Option<String>,

        /// Fraction of the window height to use, within [0, 1]
        #[arg(long)]
        fraction: Option<f64>,
    },

    /// Print the repository root enclosing a path
    Resolve {
        path: Option<PathBuf>,

        /// Print JSON instead of a bare path
        #[arg(long)]
        json: bool,
    },

    /// Show configuration
    Config {
        /// Initialize config file with defaults
        #[arg(long)]
        init: bool,
    },
}

fn setup_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        // Use info level for our crate, warn for dependencies
        EnvFilter::new("info")
            .add_directive("gix=warn".parse()?)
            .add_directive("tokio=warn".parse()?)
    };

    if let Some(path) = log_file {
        // Keep logs out of the pane the tool is drawn next to
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(file).with_target(false))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .with(filter)
            .init();
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Config {
    let loaded = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config, using defaults: {}", e);
        Config::default()
    })
}

async fn run_open(
    config: &Config,
    path: Option<PathBuf>,
    use_last: bool,
    overrides: SetupOptions,
) -> Result<()> {
    let tmux = TmuxExecutor::with_max_concurrent(config.max_concurrent_tmux)
        .with_timeout(Duration::from_millis(config.tmux_timeout_ms));
    tmux.check_installed().await?;

    let host = TmuxHost::from_env(tmux)?;
    let manager = SessionManager::new(host);

    manager.configure(&config.setup).await?;
    if !overrides.is_empty() {
        manager.configure(&overrides).await?;
    }

    let scope = manager.active_scope_key().await?;

    match manager.open(path.as_deref(), use_last).await {
        Ok(()) => {}
        Err(Error::RepositoryNotFound(path)) => {
            manager.host().shutdown().await?;
            eprintln!("Not a repository: {}", path.display());
            std::process::exit(1);
        }
        Err(e) => {
            manager.host().shutdown().await?;
            return Err(e.into());
        }
    }

    info!("Waiting for session {} to close", scope);

    tokio::select! {
        _ = manager.wait_closed(&scope) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, closing session {}", scope);
            manager.drop_session(&scope).await;
        }
    }

    manager.host().shutdown().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre error hooks
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    setup_logging(cli.debug || config.debug, config.log_file.as_deref())?;

    match cli.command {
        None => {
            info!("Starting lazypane v{}", VERSION);
            run_open(&config, None, true, SetupOptions::default()).await?;
        }

        Some(Commands::Open {
            path,
            no_last,
            scope,
            fraction,
        }) => {
            info!("Starting lazypane v{}", VERSION);
            let overrides = SetupOptions {
                scope,
                window_fraction: fraction,
                ..Default::default()
            };
            run_open(&config, path, !no_last, overrides).await?;
        }

        Some(Commands::Resolve { path, json }) => {
            let path = match path {
                Some(path) => path,
                None => std::env::current_dir()?,
            };

            let root = repo::resolve(&path);

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "path": path,
                        "root": root,
                    }))?
                );
            } else if let Some(root) = &root {
                println!("{}", root.display());
            }

            if root.is_none() {
                if !json {
                    eprintln!("Not a repository: {}", path.display());
                }
                std::process::exit(1);
            }
        }

        Some(Commands::Config { init }) => {
            let config_path = match cli.config {
                Some(path) => path,
                None => Config::config_file_path()?,
            };

            if init {
                config.save_to(&config_path)?;
                println!("Configuration initialized at {:?}", config_path);
            } else {
                println!("Configuration:");
                println!("{}", toml::to_string_pretty(&config)?);
                println!("\nConfig file: {:?}", config_path);
            }
        }
    }

    Ok(())
}
