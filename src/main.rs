use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vigil::config::AppConfig;
use vigil::error::{Result, VigilError};
use vigil::notify::Notifier;
use vigil::procs::ProcDirectory;
use vigil::remedy::{ActionExecutor, SystemctlControl};
use vigil::shutdown::{install_signal_handlers, Shutdown};
use vigil::sources::{LivenessLagSource, MemoryPressureSource, MetricSource, Reading};
use vigil::watchdog::Watchdog;
use vigil::ThresholdSet;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(version = "0.1.0")]
#[command(about = "Escalating-threshold self-healing watchdog daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config directory
    #[arg(short, long, default_value = "config")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the watchdog loops until shutdown
    Run {
        /// Which watchdog instance(s) to run
        #[arg(short, long, value_enum, default_value = "all")]
        instance: Instance,
    },
    /// Sample and classify once, without remediation
    Check {
        /// Which watchdog instance(s) to check
        #[arg(short, long, value_enum, default_value = "all")]
        instance: Instance,
    },
    /// Load and validate configuration
    Validate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Instance {
    Liveness,
    Memory,
    All,
}

impl Instance {
    fn includes_liveness(self) -> bool {
        matches!(self, Instance::Liveness | Instance::All)
    }

    fn includes_memory(self) -> bool {
        matches!(self, Instance::Memory | Instance::All)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { instance } => {
            let config = load_validated(&cli.config)?;
            init_logging(&config.logging.level, config.logging.json);
            run_daemon(config, instance).await
        }
        Commands::Check { instance } => {
            init_logging_simple();
            let config = load_validated(&cli.config)?;
            run_check(&config, instance).await
        }
        Commands::Validate => {
            init_logging_simple();
            match load_validated(&cli.config) {
                Ok(_) => {
                    println!("\x1b[32m✓ Configuration is valid\x1b[0m");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
    }
}

fn load_validated(config_dir: &str) -> Result<AppConfig> {
    let config = AppConfig::load_from(config_dir)?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("\x1b[31m✗ {e}\x1b[0m");
        }
        return Err(VigilError::Internal(format!(
            "configuration invalid ({} error(s))",
            errors.len()
        )));
    }
    Ok(config)
}

async fn run_daemon(config: AppConfig, instance: Instance) -> Result<()> {
    let notifier = Notifier::from_config(
        config.notify.webhook_url.as_deref(),
        config.notify.min_interval_secs,
    );
    let procs = Arc::new(ProcDirectory::new());
    let services = Arc::new(SystemctlControl);
    let action_timeout = Duration::from_secs(config.action_timeout_secs);

    let shutdown = Arc::new(Shutdown::new());
    let mut handles = Vec::new();

    if instance.includes_liveness() && config.liveness.enabled {
        let source = LivenessLagSource::new(&config.liveness.state_file);
        info!(state_file = %source.state_file().display(), "monitoring liveness state");
        let watchdog = Watchdog::new(
            "liveness",
            Box::new(source),
            Duration::from_secs(config.liveness.interval_secs),
            ThresholdSet::new(config.liveness.thresholds)?,
            config.liveness.catalog(),
            ActionExecutor::new(procs.clone(), services.clone(), action_timeout),
            notifier.clone(),
        );
        handles.push(tokio::spawn(watchdog.run(shutdown.subscribe())));
    }

    if instance.includes_memory() && config.memory.enabled {
        let watchdog = Watchdog::new(
            "memory",
            Box::new(MemoryPressureSource::new()),
            Duration::from_secs(config.memory.interval_secs),
            ThresholdSet::new(config.memory.thresholds)?,
            config.memory.catalog(),
            ActionExecutor::new(procs.clone(), services.clone(), action_timeout),
            notifier.clone(),
        );
        handles.push(tokio::spawn(watchdog.run(shutdown.subscribe())));
    }

    if handles.is_empty() {
        return Err(VigilError::Internal(
            "no watchdog instance enabled for this selection".to_string(),
        ));
    }

    install_signal_handlers(shutdown).await;

    for handle in handles {
        if let Err(e) = handle.await {
            error!("watchdog task failed: {e}");
        }
    }

    info!("all watchdogs stopped");
    Ok(())
}

async fn run_check(config: &AppConfig, instance: Instance) -> Result<()> {
    if instance.includes_liveness() {
        let thresholds = ThresholdSet::new(config.liveness.thresholds)?;
        let mut source = LivenessLagSource::new(&config.liveness.state_file);
        print_check("liveness", &mut source, &thresholds).await;
    }

    if instance.includes_memory() {
        let thresholds = ThresholdSet::new(config.memory.thresholds)?;
        let mut source = MemoryPressureSource::new();
        print_check("memory", &mut source, &thresholds).await;
    }

    Ok(())
}

async fn print_check(instance: &str, source: &mut dyn MetricSource, thresholds: &ThresholdSet) {
    let sample = source.read().await;
    match sample.reading {
        Reading::Value(value) => {
            let severity = thresholds.classify(value);
            println!(
                "  {:<10} {:<16} {:>8.1}{:<2} {}",
                instance,
                source.signal_name(),
                value,
                source.unit(),
                severity.as_str().to_uppercase()
            );
        }
        Reading::Unavailable { reason } => {
            println!(
                "  {:<10} {:<16} {:>8} {}",
                instance,
                source.signal_name(),
                "-",
                format!("UNAVAILABLE ({reason})")
            );
        }
    }
}

fn init_logging(level: &str, json: bool) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},vigil=debug")));

    // Durable log sink: daily-rotating file appender. Falls back to
    // console-only when the log directory is not writable.
    let log_dir = std::env::var("VIGIL_LOG_DIR")
        .or_else(|_| std::env::var("LOG_DIR"))
        .unwrap_or_else(|_| "/var/log/vigil".to_string());

    // `tracing_appender::rolling::daily` panics (and with panic = "abort",
    // aborts) if it can't create the initial log file, so preflight
    // writability first.
    let file_layer = if std::fs::create_dir_all(&log_dir).is_ok() {
        let test_path = std::path::Path::new(&log_dir).join(".vigil_write_test");
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&test_path)
        {
            Ok(_) => {
                let _ = std::fs::remove_file(&test_path);

                let file_appender = tracing_appender::rolling::daily(&log_dir, "vigil.log");
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // Keep the guard alive for the life of the process.
                Box::leak(Box::new(guard));

                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true);
                if json {
                    Some(layer.json().boxed())
                } else {
                    Some(layer.boxed())
                }
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {log_dir} ({e}), file logging disabled"
                );
                None
            }
        }
    } else {
        eprintln!("Warning: Could not create log directory {log_dir}, file logging disabled");
        None
    };

    // Operator-visible echo
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let file_logging_enabled = file_layer.is_some();
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if file_logging_enabled {
        eprintln!("Logging to: {log_dir}/vigil.log");
    }
}

fn init_logging_simple() {
    // Minimal logging for CLI commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}
