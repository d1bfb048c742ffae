//! Job watcher CLI
//!
//! Runs the scrape schedule in the foreground, or one-off maintenance
//! commands against the ledgers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use job_watch::{
    find_unseen, sites, spawn_unseen_refresh, AppendLog, ConfigError, Cycle, CycleConfig, DesktopNotifier,
    FileLedgerStore, HttpBrowser, JobStore, ManualTrigger, Notifier, RunDriver, ScheduleConfig,
    Scheduler, ScreenshotStore, TracingNotifier, TracingStatus, WatchConfig,
};

#[derive(Parser)]
#[command(name = "job-watch")]
#[command(about = "Watch remote job boards and report new postings")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args)]
struct Settings {
    /// Watch targets document
    #[arg(long, env = "JOB_WATCH_CONFIG", default_value = "config.json", global = true)]
    config: PathBuf,

    /// Directory holding the per-site ledgers
    #[arg(long, env = "JOB_WATCH_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Append-only log of new jobs
    #[arg(long, env = "JOB_WATCH_LOG_FILE", default_value = "logs/jobs.log", global = true)]
    log_file: PathBuf,

    /// Directory for page captures
    #[arg(long, env = "JOB_WATCH_SCREENSHOT_DIR", default_value = "screenshots", global = true)]
    screenshot_dir: PathBuf,

    /// Captures kept per site
    #[arg(long, env = "JOB_WATCH_MAX_SCREENSHOTS", default_value_t = 5, global = true)]
    max_screenshots: usize,

    /// Base time between cycles, in seconds
    #[arg(long, env = "JOB_WATCH_INTERVAL_SECS", default_value_t = 600, global = true)]
    interval_secs: u64,

    /// Jitter added to the interval, +/- seconds
    #[arg(long, env = "JOB_WATCH_JITTER_SECS", default_value_t = 120, global = true)]
    jitter_secs: u64,

    /// Pause between URLs of the same site, in milliseconds
    #[arg(long, env = "JOB_WATCH_COOLDOWN_MS", default_value_t = 2000, global = true)]
    cooldown_ms: u64,

    /// Navigation and readiness timeout, in seconds
    #[arg(long, env = "JOB_WATCH_TIMEOUT_SECS", default_value_t = 30, global = true)]
    timeout_secs: u64,

    /// Pause after a failed URL, in milliseconds
    #[arg(long, env = "JOB_WATCH_ERROR_DELAY_MS", default_value_t = 3000, global = true)]
    error_delay_ms: u64,

    /// How often the unseen index is recomputed, in seconds
    #[arg(long, env = "JOB_WATCH_UNSEEN_REFRESH_SECS", default_value_t = 30, global = true)]
    unseen_refresh_secs: u64,

    /// Send desktop notifications for new jobs
    #[arg(
        long,
        env = "JOB_WATCH_NOTIFY",
        default_value_t = true,
        action = clap::ArgAction::Set,
        global = true
    )]
    notify: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape on a schedule until interrupted (default)
    Watch,

    /// Run a single scrape cycle and exit
    Once,

    /// List jobs nobody has acknowledged yet
    Unseen,

    /// Open a job in the default browser and acknowledge it
    Open {
        /// Job id as shown by `unseen`
        id: String,

        /// Only look in this site's ledger
        #[arg(long)]
        site: Option<String>,
    },

    /// Acknowledge a job
    MarkSeen {
        /// Job id as shown by `unseen`
        id: String,

        /// Only look in this site's ledger
        #[arg(long)]
        site: Option<String>,
    },

    /// List supported sites and how many URLs are configured for each
    Sites,
}

impl Settings {
    fn cycle_config(&self) -> CycleConfig {
        CycleConfig::new()
            .with_cooldown(Duration::from_millis(self.cooldown_ms))
            .with_page_timeout(Duration::from_secs(self.timeout_secs))
            .with_error_delay(Duration::from_millis(self.error_delay_ms))
    }

    fn schedule_config(&self) -> ScheduleConfig {
        ScheduleConfig::new()
            .with_base_interval(Duration::from_secs(self.interval_secs))
            .with_jitter(Duration::from_secs(self.jitter_secs))
    }

    fn notifier(&self) -> Arc<dyn Notifier> {
        if self.notify {
            if let Some(desktop) = DesktopNotifier::detect() {
                return Arc::new(desktop);
            }
            tracing::warn!("No desktop notifier found, new jobs will only be logged");
        }
        Arc::new(TracingNotifier)
    }

    async fn driver(&self, store: Arc<dyn JobStore>) -> Result<RunDriver> {
        let config = WatchConfig::load(&self.config)
            .await
            .with_context(|| format!("Failed to load watch config {}", self.config.display()))?;

        Ok(RunDriver::with_observer(
            Arc::new(HttpBrowser::new()),
            store,
            config,
            Arc::new(TracingStatus::new()),
        )
        .with_cycle_config(self.cycle_config())
        .with_screenshots(ScreenshotStore::new(&self.screenshot_dir, self.max_screenshots))
        .with_log(Arc::new(AppendLog::new(&self.log_file)))
        .with_notifier(self.notifier()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,job_watch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();
    let settings = cli.settings;
    let store = Arc::new(FileLedgerStore::new(&settings.data_dir));

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => watch(&settings, store).await,
        Commands::Once => once(&settings, store).await,
        Commands::Unseen => unseen(store.as_ref()).await,
        Commands::Open { id, site } => open_job(store.as_ref(), &id, site.as_deref()).await,
        Commands::MarkSeen { id, site } => mark_seen(store.as_ref(), &id, site.as_deref()).await,
        Commands::Sites => list_sites(&settings).await,
    }
}

async fn watch(settings: &Settings, store: Arc<FileLedgerStore>) -> Result<()> {
    let driver = settings.driver(store.clone()).await?;
    let status = driver.status();
    let scheduler = Scheduler::new(driver, settings.schedule_config(), status.clone());
    let shutdown = CancellationToken::new();

    let refresh = spawn_unseen_refresh(
        store,
        status,
        Duration::from_secs(settings.unseen_refresh_secs.max(1)),
        shutdown.clone(),
    );
    listen_for_trigger(scheduler.trigger());

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            tracing::info!("Interrupted, stopping after the current cycle (Ctrl-C again to exit now)");
            shutdown.cancel();

            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    }

    tracing::info!("Watching for new jobs. Type `r` and press Enter to scrape now.");
    scheduler.run(shutdown).await;
    refresh.await.context("Unseen refresh task panicked")?;
    Ok(())
}

/// Read stdin lines on a dedicated thread; `r` starts the next cycle early.
///
/// Not a tokio task: a pending stdin read blocks runtime shutdown.
fn listen_for_trigger(trigger: ManualTrigger) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) if line.trim().eq_ignore_ascii_case("r") => {
                    if !trigger.trigger() {
                        tracing::info!("A scrape is already running");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin, manual trigger disabled");
                    break;
                }
            }
        }
    });
}

async fn once(settings: &Settings, store: Arc<FileLedgerStore>) -> Result<()> {
    let driver = settings.driver(store).await?;
    let summary = driver.run_cycle().await.context("Scrape cycle failed")?;

    println!(
        "Run {}: {} site(s), {} URL(s) visited, {} failed, {} redirected",
        summary.run_number,
        summary.sites,
        summary.urls_visited,
        summary.urls_failed,
        summary.urls_skipped
    );
    println!(
        "{} job(s) scraped, {}",
        summary.jobs_scraped,
        format!("{} new", summary.new_jobs).green().bold()
    );
    Ok(())
}

async fn unseen(store: &FileLedgerStore) -> Result<()> {
    let jobs = store
        .unseen_across_all_sites()
        .await
        .context("Failed to read ledgers")?;

    if jobs.is_empty() {
        println!("{}", "No unseen jobs".dimmed());
        return Ok(());
    }

    println!("{}", format!("{} unseen job(s)", jobs.len()).bold());
    for unseen in &jobs {
        println!(
            "{}  {}  {}",
            unseen.job.date.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            unseen.site.cyan(),
            unseen.job.id.yellow()
        );
        println!("    {}", unseen.job.url);
    }
    Ok(())
}

async fn open_job(store: &FileLedgerStore, id: &str, site: Option<&str>) -> Result<()> {
    let Some(unseen) = find_unseen(store, id, site)
        .await
        .context("Failed to read ledgers")?
    else {
        anyhow::bail!("No unseen job with id {id}");
    };

    open::that(&unseen.job.url).with_context(|| format!("Failed to open {}", unseen.job.url))?;
    println!("{} {}", "Opened:".green(), unseen.job.url);

    store
        .mark_seen_in(&unseen.site, id)
        .await
        .with_context(|| format!("Failed to update ledger for {}", unseen.site))?;
    println!("{} {} ({})", "Marked as seen:".green(), id, unseen.site);
    Ok(())
}

async fn mark_seen(store: &FileLedgerStore, id: &str, site: Option<&str>) -> Result<()> {
    let changed = match site {
        Some(site) => store
            .mark_seen_in(site, id)
            .await
            .with_context(|| format!("Failed to update ledger for {site}"))?
            .then(|| site.to_string()),
        None => store
            .mark_seen(id)
            .await
            .context("Failed to update ledgers")?,
    };

    match changed {
        Some(site) => println!("{} {} ({})", "Marked as seen:".green(), id, site),
        None => println!("{} {}", "No unseen job with id".yellow(), id),
    }
    Ok(())
}

async fn list_sites(settings: &Settings) -> Result<()> {
    // The site list is useful even without a config
    let config = match WatchConfig::load(&settings.config).await {
        Ok(config) => config,
        Err(ConfigError::Missing { .. }) => WatchConfig::default(),
        Err(e) => return Err(e).context("Failed to load watch config"),
    };

    for scraper in sites::registry() {
        let urls = scraper.target_urls(&config.urls).len();
        let tags = scraper.target_tags(&config.tags).len();
        let line = format!("{:<28} {urls} URL(s), {tags} tag(s)", scraper.site());
        if urls == 0 {
            println!("{}", line.dimmed());
        } else {
            println!("{line}");
        }
    }
    Ok(())
}
