use anyhow::{Context, Result};
use clap::Parser;
use retention_sweeper::{
    app::{run_sweep, StorageBackend, SweepConfig, DEFAULT_ENDPOINT, DEFAULT_REGION},
    domain::models::{ReconcileScope, MAX_DELETE_BATCH},
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "retention-sweeper")]
#[command(about = "Permanently delete expired non-current versions and delete markers from a versioned bucket", long_about = None)]
struct Cli {
    /// Bucket to sweep
    #[arg(short, long, env = "SWEEP_BUCKET")]
    bucket: String,

    /// Only sweep keys under this prefix
    #[arg(short, long, env = "SWEEP_PREFIX")]
    prefix: Option<String>,

    /// Days a non-current version or delete marker is kept
    #[arg(short, long, env = "SWEEP_RETENTION_DAYS", default_value_t = 1)]
    retention_days: u32,

    /// S3-compatible endpoint URL
    #[arg(long, env = "S3_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// S3 region used for request signing
    #[arg(long, env = "S3_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// S3 access key
    #[arg(long, env = "S3_ACCESS_KEY")]
    access_key: String,

    /// S3 secret key
    #[arg(long, env = "S3_SECRET_KEY", hide_env_values = true)]
    secret_key: String,

    /// Objects per delete request
    #[arg(long, env = "SWEEP_BATCH_SIZE", default_value_t = MAX_DELETE_BATCH)]
    batch_size: usize,

    /// Ask the backend to report every deleted object, not only failures
    #[arg(long)]
    verbose_delete: bool,

    /// Count and classify only; delete nothing
    #[arg(long, env = "SWEEP_DRY_RUN")]
    dry_run: bool,

    /// Recount the whole bucket after deleting, not only the prefix
    #[arg(long)]
    reconcile_whole_bucket: bool,

    /// HTTP request timeout in seconds
    #[arg(long, env = "S3_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Cli {
    fn to_sweep_config(&self) -> SweepConfig {
        let backend = StorageBackend::S3 {
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            timeout: Some(Duration::from_secs(self.timeout_secs)),
        };

        let mut config = SweepConfig::new(self.bucket.clone(), backend);
        config.prefix = self.prefix.clone().filter(|p| !p.is_empty());
        config.retention_days = self.retention_days;
        config.batch_size = self.batch_size;
        config.quiet = !self.verbose_delete;
        config.dry_run = self.dry_run;
        if self.reconcile_whole_bucket {
            config.reconcile_scope = ReconcileScope::WholeBucket;
        }
        config
    }

    fn init_logging(&self) -> Result<()> {
        let level = match self.log_level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" => "warn",
            "error" => "error",
            _ => "info",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("Failed to initialize logging")?;

        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    cli.init_logging()?;

    let config = cli.to_sweep_config();
    info!(
        bucket = %config.bucket,
        prefix = config.prefix.as_deref().unwrap_or(""),
        retention_days = config.retention_days,
        endpoint = %cli.endpoint,
        "Starting retention-sweeper"
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current request");
            on_signal.cancel();
        }
    });

    let report = run_sweep(config, cancel)
        .await
        .context("Retention sweep failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    if report.has_item_failures() {
        warn!(
            failed = report.item_failures.len(),
            "Some objects could not be deleted"
        );
    }

    Ok(())
}
