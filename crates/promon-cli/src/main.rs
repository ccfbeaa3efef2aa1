mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use promon_core::{
    build_notifiers, EventKind, HealthCheck, HttpChecker, Monitor, NotificationDispatcher,
    NotificationEvent,
};

use crate::config::{AppConfig, LoggingConfig};

/// Endpoint health monitor: probe HTTP(S) targets, alert on faults, announce recovery.
#[derive(Parser)]
#[command(name = "promon", version = env!("PROMON_VERSION"), about)]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor loop until interrupted (default).
    Run,
    /// Probe every target once and print the results. Sends no notifications.
    Check,
    /// Send a test notification through every configured channel.
    TestNotifiers,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_monitor(&cli.config).await,
        Commands::Check => run_check(&cli.config).await,
        Commands::TestNotifiers => run_test_notifiers(&cli.config).await,
    }
}

async fn run_monitor(config_path: &Path) -> ExitCode {
    let app_config = match AppConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            init_console_tracing("info");
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = match init_tracing(&app_config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            init_console_tracing("info");
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(path = %config_path.display(), "Loaded config file");
    if let Some(ref file) = app_config.logging.file {
        tracing::info!(file = %file.display(), "Logging to file");
    }

    let monitor_config = app_config.to_monitor_config();

    let notifiers = match build_notifiers(&app_config.notifier, &monitor_config.app_name) {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize notifiers");
            return ExitCode::FAILURE;
        }
    };
    let dispatcher = NotificationDispatcher::new(notifiers);

    let checker = match HttpChecker::from_config(&monitor_config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize HTTP checker");
            return ExitCode::FAILURE;
        }
    };
    if !monitor_config.verify_tls {
        tracing::debug!("TLS certificate verification is disabled for probes");
    }

    let monitor = Monitor::start(
        app_config.to_targets(),
        monitor_config,
        Arc::new(checker),
        dispatcher,
    )
    .await;

    let monitor = monitor.run(shutdown_signal()).await;
    tracing::info!(cycles = monitor.cycles(), "Shutdown complete");
    ExitCode::SUCCESS
}

async fn run_check(config_path: &Path) -> ExitCode {
    init_console_tracing("warn");

    let app_config = match AppConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    let monitor_config = app_config.to_monitor_config();
    let checker = match HttpChecker::from_config(&monitor_config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{} {}",
        style(&monitor_config.app_name).bold(),
        style(env!("PROMON_VERSION")).dim()
    );
    println!(
        "  {} {}s",
        style("timeout:").dim(),
        monitor_config.request_timeout.as_secs()
    );
    println!();

    let spinner = ProgressBar::new_spinner().with_style(
        ProgressStyle::with_template("{spinner} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut failing = 0usize;
    for target in app_config.to_targets() {
        spinner.set_message(format!("checking {}", target.url));
        let line = match checker.check(&target).await {
            Ok(outcome) if outcome.is_success() => {
                format!("{:<6} {}", style("OK").green().bold(), target.url)
            }
            Ok(outcome) => {
                failing += 1;
                format!(
                    "{:<6} {}  {}",
                    style("FAIL").red().bold(),
                    target.url,
                    style(outcome).red()
                )
            }
            Err(e) => {
                failing += 1;
                format!(
                    "{:<6} {}  {}",
                    style("ERROR").red().bold(),
                    target.url,
                    style(e).red()
                )
            }
        };
        spinner.println(format!(
            "  {}  {}",
            style(Local::now().format("%H:%M:%S")).dim(),
            line
        ));
    }
    spinner.finish_and_clear();

    println!();
    if failing == 0 {
        println!("{}", style("All targets healthy").green());
        ExitCode::SUCCESS
    } else {
        println!(
            "{}",
            style(format!("{} target(s) failing", failing)).red().bold()
        );
        ExitCode::FAILURE
    }
}

async fn run_test_notifiers(config_path: &Path) -> ExitCode {
    init_console_tracing("warn");

    let app_config = match AppConfig::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    let monitor_config = app_config.to_monitor_config();
    let notifiers = match build_notifiers(&app_config.notifier, &monitor_config.app_name) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    if notifiers.is_empty() {
        println!("{}", style("No notifiers configured").yellow());
        return ExitCode::SUCCESS;
    }

    let dispatcher =
        NotificationDispatcher::new(notifiers).with_timeout(monitor_config.notify_timeout);
    let event = NotificationEvent::new(
        EventKind::Startup,
        promon_core::monitor::event::SUBJECT_STARTUP,
        format!("test notification, PID: {}", std::process::id()),
    );
    let report = dispatcher.dispatch(&event).await;

    for channel in &report.delivered {
        println!("  {:<8} {}", style(channel).bold(), style("delivered").green());
    }
    for (channel, e) in &report.failed {
        println!("  {:<8} {}", style(channel).bold(), style(e).red());
    }

    if report.all_delivered() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn init_console_tracing(default_level: &str) {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

/// Console output in the configured format, plus a rolling file when one is set.
/// The returned guard must live until exit so buffered file output is flushed.
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>, String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = logging.format == "json";

    let (file_layer, guard) = match logging.file {
        Some(ref path) => {
            let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(|| fmt::layer()))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn file_appender(path: &Path) -> Result<RollingFileAppender, String> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("promon");

    let mut builder = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(10);
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        builder = builder.filename_suffix(ext);
    }

    builder
        .build(dir)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))
}
