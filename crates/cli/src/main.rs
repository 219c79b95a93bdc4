use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use synapse_cleaner::config::{load_config, validate_config, CleanerConfig};
use synapse_cleaner::media::{MediaBackend, MediaLibrary};
use synapse_cleaner::synapse::SynapseAdmin;
use synapse_cleaner::{PurgeOutcome, Purger, RemoteBackend, Renderer, Screen};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "synapse-cleaner")]
#[command(about = "Remove unused rooms and media from a Synapse homeserver", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Maximum number of deletions running at once
    #[arg(long, value_name = "N", global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delete every room the given user is not joined to
    PurgeRooms {
        /// User whose rooms are kept, e.g. @admin:example.org
        user: String,

        /// Homeserver base URL
        #[arg(short, long)]
        server: String,

        /// Admin access token
        #[arg(long, env = "ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
    },

    /// Delete local media files the database does not reference
    PurgeMedias {
        /// PostgreSQL connection URI of the Synapse database
        #[arg(short, long, env = "SYNAPSE_DB_URI", hide_env_values = true)]
        database_uri: String,

        /// Synapse media store directory
        #[arg(short, long, value_name = "DIR")]
        media_directory: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they do not break the progress display
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_ansi(true)
        .init();

    let args = Args::parse();
    info!("Synapse cleaner v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    if let Some(concurrency) = args.concurrency {
        config.max_concurrent_jobs = concurrency;
        validate_config(&config)?;
    }
    info!("Max concurrent jobs: {}", config.max_concurrent_jobs);

    match args.command {
        Command::PurgeRooms {
            user,
            server,
            access_token,
        } => {
            let backend = SynapseAdmin::new(&server, access_token, user, config.request_timeout())?;
            purge(backend, config).await
        }
        Command::PurgeMedias {
            database_uri,
            media_directory,
        } => {
            let library = MediaLibrary::new(media_directory);
            let backend =
                MediaBackend::connect(library, &database_uri, config.request_timeout()).await?;
            purge(backend, config).await
        }
    }
}

async fn purge<B: RemoteBackend>(backend: B, config: CleanerConfig) -> Result<()> {
    let footer_height = config.footer_height;
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();

    let purger = Purger::new(backend, config).with_cancellation(cancel);
    let mut input = io::stdin().lock();
    let mut output = io::stdout();

    let outcome = purger
        .run(&mut input, &mut output, || {
            let renderer = Renderer::stdout(footer_height)?;
            let (columns, _) = crossterm::terminal::size()?;

            // Ctrl-C is only intercepted once deletions are running; a second
            // one exits immediately.
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling remaining deletions");
                    ctrl_c.cancel();
                }
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });

            Ok(Screen { renderer, columns })
        })
        .await?;

    if let PurgeOutcome::Completed(report) = outcome {
        info!(
            "{} deleted, {} failures out of {}",
            report.deleted,
            report.failures.len(),
            report.total
        );
    }

    Ok(())
}
