use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    adapters::outbound::storage::{InMemoryVersionedBucket, S3Config, S3VersionedClient},
    domain::{
        errors::{SweepError, ValidationError},
        models::{ReconcileScope, SweepReport, SweepRequest, MAX_DELETE_BATCH},
        value_objects::BucketName,
    },
    ports::{services::SweepService, storage::VersionedBucketClient},
    services::RetentionSweepService,
};

/// Endpoint used when none is configured
pub const DEFAULT_ENDPOINT: &str = "https://s3.ap-southeast-1.wasabisys.com/";
pub const DEFAULT_REGION: &str = "ap-southeast-1";
pub const DEFAULT_RETENTION_DAYS: u32 = 1;

/// Storage backend configuration
#[derive(Clone)]
pub enum StorageBackend {
    InMemory(InMemoryVersionedBucket),
    S3 {
        endpoint: String,
        region: String,
        access_key: String,
        secret_key: String,
        timeout: Option<Duration>,
    },
}

impl fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::InMemory(_) => f.write_str("InMemory"),
            StorageBackend::S3 {
                endpoint,
                region,
                access_key,
                timeout,
                ..
            } => f
                .debug_struct("S3")
                .field("endpoint", endpoint)
                .field("region", region)
                .field("access_key", access_key)
                .field("secret_key", &"<redacted>")
                .field("timeout", timeout)
                .finish(),
        }
    }
}

/// Everything one sweep needs, passed explicitly
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub bucket: String,
    pub prefix: Option<String>,
    pub retention_days: u32,
    /// Fixed "now"; the sweep captures the current time when unset
    pub reference_time: Option<DateTime<Utc>>,
    pub quiet: bool,
    pub batch_size: usize,
    pub reconcile_scope: ReconcileScope,
    pub dry_run: bool,
    pub backend: StorageBackend,
}

impl SweepConfig {
    pub fn new(bucket: impl Into<String>, backend: StorageBackend) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
            retention_days: DEFAULT_RETENTION_DAYS,
            reference_time: None,
            quiet: true,
            batch_size: MAX_DELETE_BATCH,
            reconcile_scope: ReconcileScope::default(),
            dry_run: false,
            backend,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `SWEEP_BUCKET`, `SWEEP_PREFIX`, `SWEEP_RETENTION_DAYS`,
    /// `SWEEP_BATCH_SIZE`, `SWEEP_DRY_RUN`, `SWEEP_RECONCILE_WHOLE_BUCKET`,
    /// `S3_ENDPOINT`, `S3_REGION`, `S3_ACCESS_KEY` and `S3_SECRET_KEY`.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let bucket = lookup("SWEEP_BUCKET").ok_or_else(|| AppError::Configuration {
            message: "SWEEP_BUCKET environment variable required".to_string(),
        })?;

        let backend = StorageBackend::S3 {
            endpoint: lookup("S3_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            region: lookup("S3_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            access_key: lookup("S3_ACCESS_KEY").unwrap_or_default(),
            secret_key: lookup("S3_SECRET_KEY").unwrap_or_default(),
            timeout: None,
        };

        let mut config = Self::new(bucket, backend);
        config.prefix = lookup("SWEEP_PREFIX").filter(|p| !p.is_empty());
        if let Some(days) = lookup("SWEEP_RETENTION_DAYS") {
            config.retention_days = parse_setting("SWEEP_RETENTION_DAYS", &days)?;
        }
        if let Some(size) = lookup("SWEEP_BATCH_SIZE") {
            config.batch_size = parse_setting("SWEEP_BATCH_SIZE", &size)?;
        }
        if let Some(dry_run) = lookup("SWEEP_DRY_RUN") {
            config.dry_run = parse_flag(&dry_run);
        }
        if lookup("SWEEP_RECONCILE_WHOLE_BUCKET").is_some_and(|v| parse_flag(&v)) {
            config.reconcile_scope = ReconcileScope::WholeBucket;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        BucketName::new(self.bucket.as_str())?;

        if !(1..=MAX_DELETE_BATCH).contains(&self.batch_size) {
            return Err(ValidationError::InvalidField {
                field: "batch_size".to_string(),
                value: self.batch_size.to_string(),
                expected: format!("a value between 1 and {}", MAX_DELETE_BATCH),
            });
        }

        if let StorageBackend::S3 {
            endpoint,
            region,
            access_key,
            secret_key,
            ..
        } = &self.backend
        {
            for (field, value) in [
                ("endpoint", endpoint),
                ("region", region),
                ("access_key", access_key),
                ("secret_key", secret_key),
            ] {
                if value.trim().is_empty() {
                    return Err(ValidationError::MissingField(field.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Validate and turn the configuration into a sweep request
    pub fn to_request(&self) -> Result<SweepRequest, ValidationError> {
        self.validate()?;
        let bucket = BucketName::new(self.bucket.as_str())?;

        let mut request = SweepRequest::new(bucket, self.retention_days)
            .with_quiet(self.quiet)
            .with_batch_size(self.batch_size)
            .with_reconcile_scope(self.reconcile_scope)
            .with_dry_run(self.dry_run);
        if let Some(prefix) = &self.prefix {
            request = request.with_prefix(prefix.as_str());
        }
        if let Some(reference_time) = self.reference_time {
            request = request.with_reference_time(reference_time);
        }
        Ok(request)
    }
}

fn parse_setting<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AppError> {
    value.trim().parse().map_err(|_| AppError::Configuration {
        message: format!("{} has an invalid value: '{}'", name, value),
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

/// Application builder for dependency injection
pub struct AppBuilder {
    backend: StorageBackend,
    client: Option<Arc<dyn VersionedBucketClient>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            backend: StorageBackend::InMemory(InMemoryVersionedBucket::new()),
            client: None,
        }
    }

    /// Configure storage backend
    pub fn with_backend(mut self, backend: StorageBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Use an already constructed client, bypassing the backend setting
    pub fn with_client(mut self, client: Arc<dyn VersionedBucketClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Create the storage client based on configuration
    pub fn build_client(&self) -> Result<Arc<dyn VersionedBucketClient>, AppError> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }

        match &self.backend {
            StorageBackend::InMemory(store) => Ok(Arc::new(store.clone())),
            StorageBackend::S3 {
                endpoint,
                region,
                access_key,
                secret_key,
                timeout,
            } => {
                let mut config = S3Config::new(
                    endpoint.as_str(),
                    region.as_str(),
                    access_key.as_str(),
                    secret_key.as_str(),
                );
                if let Some(timeout) = timeout {
                    config = config.with_timeout(*timeout);
                }
                let client = S3VersionedClient::new(config).map_err(|e| AppError::StorageInit {
                    message: e.to_string(),
                })?;
                Ok(Arc::new(client))
            }
        }
    }

    /// Build the sweep service
    pub fn build(self) -> Result<RetentionSweepService, AppError> {
        Ok(RetentionSweepService::new(self.build_client()?))
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage initialization error: {message}")]
    StorageInit { message: String },

    #[error(transparent)]
    Sweep(#[from] SweepError),
}

/// Run one sweep end to end: validate, connect, enumerate, delete, reconcile
pub async fn run_sweep(
    config: SweepConfig,
    cancel: CancellationToken,
) -> Result<SweepReport, AppError> {
    let request = config.to_request().map_err(SweepError::from)?;
    info!(backend = ?config.backend, bucket = %request.bucket, "Configured sweep");

    let service = AppBuilder::new().with_backend(config.backend).build()?;
    Ok(service.sweep(request, cancel).await?)
}
