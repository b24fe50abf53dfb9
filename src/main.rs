use clap::Parser;
use etcd_scribe::CollectorService;
use etcd_scribe::Result;
use etcd_scribe::Settings;
use etcd_scribe::SettingsOverrides;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Watches an etcd key prefix and records every change into a local,
/// compressed history database.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<String>,

    /// etcd endpoint to subscribe to
    #[arg(long)]
    etcd_host: Option<String>,

    /// Key prefix to watch
    #[arg(long)]
    etcd_path: Option<String>,

    /// Database storage file name
    #[arg(long)]
    db_file: Option<String>,

    /// Seconds between bucket flushes
    #[arg(long)]
    db_time: Option<u64>,

    /// Seconds between stats reports
    #[arg(long)]
    db_report: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            etcd_host: self.etcd_host.clone(),
            etcd_path: self.etcd_path.clone(),
            db_file: self.db_file.clone(),
            db_time: self.db_time,
            db_report: self.db_report,
        }
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initializing Logs
    init_observability();

    let settings = Settings::load(cli.config.as_deref(), cli.overrides())?;
    info!(
        etcd_host = %settings.etcd_host,
        etcd_path = %settings.etcd_path,
        db_file = %settings.db_file.display(),
        db_time = settings.db_time,
        db_report = settings.db_report,
        "starting"
    );

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    // Listen on Shutdown Signal
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("failed to install signal handlers: {e}");
        }
    });

    // Run the collector until the signal arrives
    let service = CollectorService::new(settings);
    let result = service.run(graceful_rx).await;
    if let Err(e) = &result {
        error!("collector stops: {e}");
    }

    info!("stopped");
    result
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    if graceful_tx.send(()).is_err() {
        warn!("shutdown receiver already gone");
    }
    Ok(())
}

fn init_observability() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
