//! catsync - camera catalog sync tool
//!
//! Mirrors the YAML product tree into the catalog database and reports what
//! changed. Summaries go to stdout, logs to stderr.

mod report;

use anyhow::{Context, Result};
use catalog_sync::loader::DEFAULT_LOAD_CONCURRENCY;
use catalog_sync::store::CatalogStore;
use catalog_sync::{validator, SyncEngine, SyncOptions};
use clap::{Args, Parser, Subcommand};
use colored::*;
use common::{CancellationToken, CatalogConfig, LogConfig, LogFormat, SqliteClient};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "catsync")]
#[command(about = "Sync the YAML camera catalog into the catalog database")]
#[command(long_about = "Sync the YAML camera catalog into the catalog database

Commands:
  sync        Apply the source tree to the store
  validate    Check the source tree without touching the store
  init        Create the store schema
  status      Show row counts and recent runs
  prune       Delete stored products and keywords no longer in the tree

Examples:
  catsync validate --source catalog
  catsync sync --source catalog --dry-run
  catsync sync --database-url sqlite://data/catalog.db --detailed
  catsync prune --confirm

Settings are read from catsync.yaml (or --config), then CATSYNC_* environment
variables, then command line flags.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Configuration file (default: ./catsync.yaml when present)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Log line format: text or json
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Args)]
struct SourceArgs {
    /// Directory holding Products/ (or Products/ itself)
    #[arg(short, long)]
    source: Option<PathBuf>,
}

#[derive(Args)]
struct StoreArgs {
    /// Store connection string, e.g. sqlite://data/catalog.db
    #[arg(long)]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the source tree to the store
    Sync {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        store: StoreArgs,

        /// Show the plan without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Product transactions applied at once
        #[arg(short, long)]
        workers: Option<usize>,

        /// List every failure, rejection and warning
        #[arg(short, long)]
        detailed: bool,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the source tree without touching the store
    Validate {
        #[command(flatten)]
        source: SourceArgs,

        /// Only print the totals
        #[arg(short = 'b', long = "brief")]
        brief: bool,
    },

    /// Create the store schema
    Init {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Show row counts and recent runs
    Status {
        #[command(flatten)]
        store: StoreArgs,

        /// Number of recent runs to list
        #[arg(long, default_value_t = 5)]
        runs: u32,
    },

    /// Delete stored rows no longer present in the source tree
    Prune {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        store: StoreArgs,

        /// Actually delete; without this only the orphans are listed
        #[arg(long)]
        confirm: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

impl SourceArgs {
    fn apply(self, config: &mut CatalogConfig) {
        if let Some(source) = self.source {
            config.source_root = source;
        }
    }
}

impl StoreArgs {
    fn apply(self, config: &mut CatalogConfig) {
        if let Some(url) = self.database_url {
            config.database_url = url;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut config =
        CatalogConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    let log = LogConfig {
        level: if cli.verbose {
            "debug".to_string()
        } else {
            config.log_level.clone()
        },
        format: config.log_format,
        log_dir: config.log_dir.clone(),
        ansi: !cli.no_color,
    };
    common::logging::init(&log).context("Failed to initialize logging")?;

    let ok = match cli.command {
        Commands::Sync {
            source,
            store,
            dry_run,
            workers,
            detailed,
            json,
        } => {
            source.apply(&mut config);
            store.apply(&mut config);
            if let Some(workers) = workers {
                config.workers = workers;
                config.validate()?;
            }
            sync_command(&config, dry_run, detailed, json).await?
        },
        Commands::Validate { source, brief } => {
            source.apply(&mut config);
            validate_command(&config, !brief).await?
        },
        Commands::Init { store } => {
            store.apply(&mut config);
            init_command(&config).await?
        },
        Commands::Status { store, runs } => {
            store.apply(&mut config);
            status_command(&config, runs).await?
        },
        Commands::Prune {
            source,
            store,
            confirm,
            json,
        } => {
            source.apply(&mut config);
            store.apply(&mut config);
            prune_command(&config, confirm, json).await?
        },
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn connect(config: &CatalogConfig) -> Result<SqliteClient> {
    let client = SqliteClient::connect(&config.database_url, &config.sqlite_settings()).await?;
    Ok(client)
}

/// Run `work` with Ctrl+C / SIGTERM wired to a cancellation token
async fn with_shutdown<T, F, Fut>(work: F) -> T
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: std::future::Future<Output = T>,
{
    let cancel = CancellationToken::new();
    let watcher = common::shutdown::cancel_on_shutdown(cancel.clone());
    let result = work(cancel.clone()).await;
    // ends the watcher; the run has already read the token
    cancel.cancel();
    if let Err(e) = watcher.await {
        debug!("Shutdown watcher ended abnormally: {}", e);
    }
    result
}

async fn sync_command(
    config: &CatalogConfig,
    dry_run: bool,
    detailed: bool,
    json: bool,
) -> Result<bool> {
    if !json {
        println!(
            "{} {} -> {}{}",
            "Syncing".bright_cyan(),
            config.source_root.display(),
            config.database_url.bright_yellow(),
            if dry_run { " (dry run)" } else { "" }
        );
    }

    let client = connect(config).await?;
    let options = SyncOptions {
        dry_run,
        ..SyncOptions::from_config(config)
    };
    let engine = SyncEngine::new(CatalogStore::new(client.pool().clone()), options);

    let result = with_shutdown(|cancel| async move {
        engine.run(&config.source_root, &cancel).await
    })
    .await;
    client.close().await;
    let summary = result.context("Sync failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        report::print_sync_summary(&summary, detailed);
    }
    Ok(summary.is_success())
}

async fn validate_command(config: &CatalogConfig, detailed: bool) -> Result<bool> {
    println!(
        "{} {}",
        "Validating".bright_cyan(),
        config.source_root.display()
    );

    let batch = validator::load_and_validate(&config.source_root, DEFAULT_LOAD_CONCURRENCY)
        .await
        .context("Validation failed")?;
    report::print_validation(&batch, detailed);
    Ok(batch.is_clean())
}

async fn init_command(config: &CatalogConfig) -> Result<bool> {
    if let Some(parent) = common::database_file(&config.database_url)
        .as_deref()
        .and_then(|path| path.parent())
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let client = connect(config).await?;
    CatalogStore::new(client.pool().clone())
        .init_schema()
        .await
        .context("Failed to create schema")?;
    client.close().await;

    println!(
        "{} Schema ready at {}",
        "OK".green(),
        config.database_url.bright_yellow()
    );
    Ok(true)
}

async fn status_command(config: &CatalogConfig, runs: u32) -> Result<bool> {
    let client = connect(config).await?;
    let store = CatalogStore::new(client.pool().clone());
    store.init_schema().await?;

    let counts = store.counts().await?;
    let recent = store.recent_runs(runs).await?;
    client.close().await;

    report::print_status(&config.database_url, &counts, &recent);
    Ok(true)
}

async fn prune_command(config: &CatalogConfig, confirm: bool, json: bool) -> Result<bool> {
    let client = connect(config).await?;
    let engine = SyncEngine::new(
        CatalogStore::new(client.pool().clone()),
        SyncOptions::from_config(config),
    );

    let result = with_shutdown(|cancel| async move {
        engine.prune(&config.source_root, confirm, &cancel).await
    })
    .await;
    client.close().await;
    let report = result.context("Prune failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report::print_prune(&report);
    }
    Ok(report.is_success())
}
