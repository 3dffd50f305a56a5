// src/bin/cli.rs

//! CMS Notifier CLI
//!
//! Watches course pages and pushes a notification for every new file and
//! description change.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use notifier::{
    config::Secrets,
    error::{AppError, Result},
    models::{Config, CourseId},
    pipeline::{CourseMonitor, Scheduler, SweepStats},
    storage::LocalVersionStore,
};
use tokio::sync::watch;

/// cms-notifier - Course page change notifier
#[derive(Parser, Debug)]
#[command(
    name = "cms-notifier",
    version,
    about = "Pushes notifications for new course files and description changes"
)]
struct Cli {
    /// Path to storage directory holding config.toml and version records
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep all courses on the configured interval until Ctrl-C
    Run,

    /// Run a single sweep and exit
    Once {
        /// Only check the course with this code
        #[arg(long)]
        course: Option<String>,
    },

    /// Validate configuration and secrets
    Validate,

    /// Show stored state
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    let store = Arc::new(LocalVersionStore::new(&cli.storage_dir));

    match cli.command {
        Command::Run => {
            let monitor = build_monitor(&config, Arc::clone(&store))?;
            let scheduler = scheduler_for(&config, monitor);
            let (stop_tx, stop_rx) = watch::channel(false);

            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Stop requested, finishing in-flight courses...");
                    let _ = stop_tx.send(true);
                }
            });

            log::info!(
                "Monitoring courses every {}s (storage: {})",
                config.monitor.interval_secs,
                cli.storage_dir.display()
            );
            scheduler.run(stop_rx).await;
        }

        Command::Once { course } => {
            let monitor = build_monitor(&config, Arc::clone(&store))?;
            let scheduler = scheduler_for(&config, Arc::clone(&monitor));
            let (_stop_tx, stop_rx) = watch::channel(false);

            let stats = match course {
                None => scheduler.sweep(&stop_rx).await,
                Some(code) => {
                    let wanted = CourseId::new(code);
                    let courses: Vec<_> = monitor
                        .discover()
                        .await?
                        .into_iter()
                        .filter(|c| c.code == wanted)
                        .collect();
                    if courses.is_empty() {
                        return Err(AppError::config(format!(
                            "Course {wanted} is not in the course list"
                        )));
                    }
                    scheduler.sweep_courses(courses, &stop_rx).await
                }
            };
            report(&stats)?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            Secrets::from_env(&config)?;
            log::info!("✓ Secrets OK");

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!(
                "Config: {}",
                if config_path.exists() {
                    "exists"
                } else {
                    "not found (defaults)"
                }
            );
            log::info!(
                "Notifications: {}, enrichment: {}, interval: {}s",
                on_off(config.notifications.enabled),
                on_off(config.enrichment.enabled),
                config.monitor.interval_secs
            );

            let courses = store.known_courses().await?;
            if courses.is_empty() {
                log::info!("No version records yet.");
            }
            for course in courses {
                log::info!("Tracked course: {}", course);
            }
        }
    }

    Ok(())
}

fn build_monitor(config: &Config, store: Arc<LocalVersionStore>) -> Result<Arc<CourseMonitor>> {
    config.validate()?;
    let secrets = Secrets::from_env(config)?;
    Ok(Arc::new(CourseMonitor::from_config(config, &secrets, store)?))
}

fn scheduler_for(config: &Config, monitor: Arc<CourseMonitor>) -> Scheduler {
    Scheduler::new(
        monitor,
        config.monitor.interval(),
        config.monitor.max_concurrent,
    )
}

fn report(stats: &SweepStats) -> Result<()> {
    if let Some(e) = &stats.discovery_error {
        return Err(AppError::discovery(e));
    }
    log::info!(
        "{} course(s): {} ok, {} failed, {} notification(s) sent",
        stats.discovered,
        stats.succeeded,
        stats.failed(),
        stats.notifications
    );
    for failure in &stats.failures {
        log::warn!("  {} [{}]: {}", failure.course, failure.kind, failure.message);
    }
    Ok(())
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}
