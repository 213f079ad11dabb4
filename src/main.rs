use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockwatch::catalog::open_catalog;
use stockwatch::config::Config;
use stockwatch::metrics;
use stockwatch::models::StoreType;
use stockwatch::notifications::{Channel, TelegramChannel};
use stockwatch::orchestrator::{CycleOutcome, Orchestrator};
use stockwatch::scheduler::{shutdown_signal, Daemon};
use stockwatch::utils::mask_secret;

#[derive(Parser)]
#[command(
    name = "stockwatch",
    version,
    about = "Stock availability watcher for Indian e-commerce stores with Telegram alerts",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Dotenv file loaded before reading the environment
    #[arg(long, global = true, default_value = ".env.local")]
    env_file: PathBuf,

    /// TOML configuration file (replaces environment configuration)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the watcher daemon until interrupted
    Run {
        /// Minimum sleep between cycles in seconds
        #[arg(long)]
        min_delay: Option<u64>,

        /// Maximum sleep between cycles in seconds
        #[arg(long)]
        max_delay: Option<u64>,

        /// Read products from a JSON file instead of the database
        #[arg(long)]
        catalog_file: Option<PathBuf>,
    },

    /// Run a single check cycle and print a summary
    Once {
        /// Read products from a JSON file instead of the database
        #[arg(long)]
        catalog_file: Option<PathBuf>,
    },

    /// Validate the configuration and print a redacted summary
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_loaded = load_env_file(&cli.env_file);
    let mut config = load_config(cli.config.as_deref())?;

    if let Commands::Run {
        min_delay,
        max_delay,
        ..
    } = &cli.command
    {
        if let Some(min) = min_delay {
            config.schedule.min_delay_secs = *min;
        }
        if let Some(max) = max_delay {
            config.schedule.max_delay_secs = *max;
        }
    }

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if let Some(path) = env_loaded {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }

    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Run { catalog_file, .. } => {
            tracing::info!(
                min_delay_secs = config.schedule.min_delay_secs,
                max_delay_secs = config.schedule.max_delay_secs,
                pincodes = ?config.pincodes,
                "Starting run command"
            );
            run(config, catalog_file).await?;
        }
        Commands::Once { catalog_file } => {
            tracing::info!(catalog_file = ?catalog_file, "Starting once command");
            once(config, catalog_file).await?;
        }
        Commands::CheckConfig => {
            check_config(&config)?;
        }
    }

    Ok(())
}

/// Load a dotenv file if it exists; a missing file is not an error
fn load_env_file(path: &Path) -> Option<PathBuf> {
    match dotenvy::from_path(path) {
        Ok(()) => Some(path.to_path_buf()),
        Err(e) if e.not_found() => None,
        Err(e) => {
            eprintln!("Warning: could not load {}: {e}", path.display());
            None
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    }
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "stockwatch=debug,info".to_string()
    } else {
        format!("stockwatch={level},warn")
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

/// Shared setup for `run` and `once`
fn build_orchestrator(config: &Config, catalog_file: Option<PathBuf>) -> Result<Orchestrator> {
    if let Err(e) = metrics::init_metrics() {
        tracing::warn!("Metrics disabled: {}", e);
    }

    let notifier = TelegramChannel::new(config.telegram.clone())
        .context("Failed to create Telegram channel")?;
    if !notifier.is_configured() {
        tracing::warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_GROUP_ID not set, alerts will not be sent");
    }

    let catalog = open_catalog(&config.database, catalog_file.as_deref())
        .context("Failed to open product catalog")?;

    let orchestrator = Orchestrator::new(config, catalog, Arc::new(notifier))
        .context("Failed to build orchestrator")?;
    Ok(orchestrator)
}

async fn run(config: Config, catalog_file: Option<PathBuf>) -> Result<()> {
    let orchestrator = build_orchestrator(&config, catalog_file)?;

    if let Some(addr) = &config.metrics.bind_addr {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("Invalid metrics address '{addr}'"))?;
        tokio::spawn(async move {
            if let Err(e) = metrics::server::serve(addr, shutdown_signal()).await {
                tracing::error!("Metrics endpoint failed: {}", e);
            }
        });
    }

    let daemon = Daemon::new(Arc::new(orchestrator), &config.schedule);
    let stats = daemon.run().await;

    tracing::info!(cycles = stats.cycles(), "stockwatch stopped");
    Ok(())
}

async fn once(config: Config, catalog_file: Option<PathBuf>) -> Result<()> {
    let orchestrator = build_orchestrator(&config, catalog_file)?;

    match orchestrator.run_cycle().await? {
        CycleOutcome::Completed(report) => {
            println!("Check cycle completed in {:.1}s", report.duration.as_secs_f64());
            for (store, result) in &report.stores {
                println!(
                    "  {:<18} {:>3}/{:<3} available",
                    store.display_name(),
                    result.found,
                    result.total
                );
            }
            println!(
                "Found {}/{} products available",
                report.total_found(),
                report.total_tracked()
            );
        }
        CycleOutcome::Skipped(reason) => {
            println!("Check cycle skipped: {reason}");
        }
    }

    Ok(())
}

fn check_config(config: &Config) -> Result<()> {
    let present = |v: &Option<String>| if v.is_some() { "set" } else { "missing" };

    println!("Configuration OK");
    println!();
    println!("Catalog:");
    println!("  DATABASE_URL:        {}", present(&config.database.url));
    println!("  Pool size:           {}", config.database.pool_size);
    println!("  DB timeout:          {}s", config.database.timeout_secs);

    println!("Telegram:");
    println!(
        "  Bot token:           {}",
        config
            .telegram
            .bot_token
            .as_deref()
            .map(mask_secret)
            .unwrap_or_else(|| "missing".to_string())
    );
    println!(
        "  Group id:            {}",
        config.telegram.chat_id.as_deref().unwrap_or("missing")
    );
    for store in StoreType::all() {
        if let Some(topic) = config.telegram.topic_for(store) {
            println!("  {:<20} {}", format!("{} topic:", store.display_name()), topic);
        }
    }

    let amazon = if config.amazon.credentials().is_some() {
        "complete"
    } else {
        "incomplete (Amazon checks disabled)"
    };
    println!("Amazon PA-API:         {amazon}");

    println!("Pincodes:              {}", config.pincodes.join(", "));
    println!(
        "Cycle delay:           {}-{}s (cooldown {}s)",
        config.schedule.min_delay_secs,
        config.schedule.max_delay_secs,
        config.schedule.error_cooldown_secs
    );
    println!(
        "Proxy:                 {}",
        config.http.proxy_url.as_deref().map(redact_url).unwrap_or_else(|| "none".to_string())
    );
    println!(
        "Metrics endpoint:      {}",
        config.metrics.bind_addr.as_deref().unwrap_or("disabled")
    );

    let channel = TelegramChannel::new(config.telegram.clone())
        .context("Failed to create Telegram channel")?;
    tracing::debug!(channel = %channel.config(), "Notification channel");

    Ok(())
}

/// Strip userinfo from a proxy URL before printing it
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) => {
            if !url.username().is_empty() || url.password().is_some() {
                let _ = url.set_username("****");
                let _ = url.set_password(None);
            }
            url.to_string()
        }
        Err(_) => "<invalid>".to_string(),
    }
}
