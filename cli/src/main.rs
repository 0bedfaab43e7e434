//! Bestiary service host.
//!
//! Loads settings, opens the catalog and holds it until the process is asked
//! to stop (Ctrl-C or SIGTERM), then performs the final flush.
//!
//! ```text
//! main() -> Settings::from_env() -> BestiaryHandle::open() -> shutdown_signal() -> shutdown()
//! ```
//!
//! The host owns the only [`BestiaryHandle`]; a front end embedding the catalog
//! clones it into its request handlers.
//!
//! `bestiary password <name>` prints the login for a configured admin and
//! exits without touching the catalog.

#[cfg(not(unix))]
use std::future;
use std::io;

use anyhow::{Context, Result, bail};
use bestiary_cipher::AdminAuthority;
use bestiary_config::{BestiaryConfig, Settings};
use bestiary_store::{BestiaryHandle, LoadOutcome};
use clap::{Parser, Subcommand};
use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{self, SignalKind};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "bestiary", version)]
#[command(about = "Beast catalog service with debounced persistence")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the password derived for an admin (requires SEED)
    Password {
        /// Admin name, as listed in ADMIN_NAMES
        name: String,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn print_password(settings: &Settings, name: &str) -> Result<()> {
    let Some(seed) = settings.seed else {
        bail!("SEED must be set to derive admin passwords");
    };
    let admins = AdminAuthority::new(seed, settings.admin_names.iter().cloned());
    println!("{}", admins.password_for(name)?);
    Ok(())
}

/// Resolves on the first Ctrl-C or SIGTERM.
///
/// The SIGTERM handler is installed before this returns, so a signal that
/// arrives while the catalog is still opening is not lost.
fn shutdown_signal() -> Result<impl Future<Output = Result<()>>> {
    #[cfg(unix)]
    let mut sigterm =
        unix::signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    Ok(async move {
        #[cfg(unix)]
        let terminate = async {
            sigterm.recv().await;
            tracing::info!("Received terminate signal");
        };
        #[cfg(not(unix))]
        let terminate = future::pending::<()>();

        tokio::select! {
            res = signal::ctrl_c() => {
                res.context("failed to listen for Ctrl-C")?;
                tracing::info!("Received Ctrl-C");
            }
            () = terminate => {}
        }
        Ok::<(), anyhow::Error>(())
    })
}

/// Hold the catalog until `shutdown` resolves, then flush it.
async fn run_until(
    handle: BestiaryHandle,
    shutdown: impl Future<Output = Result<()>>,
) -> Result<()> {
    shutdown.await?;
    tracing::info!("Shutdown requested");
    handle.shutdown().await.context("final save failed")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = match BestiaryConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring config file: {e}");
            None
        }
    };
    let settings = Settings::from_env(config.as_ref()).context("invalid settings")?;
    tracing::debug!(?settings, "Resolved settings");

    if let Some(Commands::Password { name }) = &cli.command {
        return print_password(&settings, name);
    }

    if settings.seed.is_none() {
        tracing::warn!("SEED is not set; admin logins cannot be verified");
    } else if settings.admin_names.is_empty() {
        tracing::warn!("No admin names configured");
    }

    let shutdown = shutdown_signal()?;
    let (handle, outcome) = BestiaryHandle::open(&settings.data_path, settings.debounce)
        .await
        .with_context(|| format!("failed to open {}", settings.data_path.display()))?;
    if let LoadOutcome::Recovered { backup } = &outcome {
        tracing::warn!(backup = %backup.display(), "Previous catalog was unreadable");
    }
    tracing::info!(
        beasts = handle.len().await,
        debounce_secs = settings.debounce.as_secs(),
        "Bestiary ready"
    );

    run_until(handle, shutdown).await
}
