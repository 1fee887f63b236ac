use std::{process::ExitCode, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use registry_upload_gc::{
    adapters::outbound::storage::{InMemoryRegistryStore, S3Config},
    app::{AppBuilder, AppConfig, StorageBackend},
    domain::{
        errors::GcError,
        models::{CleanupPolicy, GcReport, DEFAULT_CLEANUP_HOURS},
    },
    ports::SystemClock,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "registry-upload-gc")]
#[command(
    about = "Remove abandoned multipart uploads and upload folders from an S3-backed container registry",
    long_about = None
)]
struct Cli {
    /// S3 endpoint URL
    #[arg(short, long, env = "REGISTRY_GC_ENDPOINT")]
    endpoint: Option<String>,

    /// S3 region
    #[arg(short, long, env = "REGISTRY_GC_REGION")]
    region: Option<String>,

    /// Bucket holding the registry
    #[arg(short, long, env = "REGISTRY_GC_BUCKET")]
    bucket: String,

    /// S3 access key
    #[arg(short, long = "accesskey", env = "REGISTRY_GC_ACCESS_KEY")]
    access_key: Option<String>,

    /// S3 secret key
    #[arg(short, long = "secretkey", env = "REGISTRY_GC_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Registry root directory inside the bucket
    #[arg(short = 'd', long = "rootdir", env = "REGISTRY_GC_ROOT_DIR")]
    root_directory: Option<String>,

    /// Age in hours after which uploads are removed
    #[arg(short = 'c', long = "cleanup", env = "REGISTRY_GC_CLEANUP_HOURS", default_value_t = DEFAULT_CLEANUP_HOURS)]
    cleanup_hours: u32,

    /// Report what would be removed without removing anything
    #[arg(short = 'y', long = "dryrun", env = "REGISTRY_GC_DRY_RUN")]
    dry_run: bool,

    /// Log level, overridden by RUST_LOG
    #[arg(long, env = "REGISTRY_GC_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Format of the final report
    #[arg(long, env = "REGISTRY_GC_OUTPUT", value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Stop issuing store calls after this many seconds
    #[arg(long, env = "REGISTRY_GC_MAX_RUNTIME_SECS")]
    max_runtime_secs: Option<u64>,

    /// Timeout for a single S3 request, in seconds
    #[arg(long, env = "REGISTRY_GC_OPERATION_TIMEOUT_SECS", default_value_t = 30)]
    operation_timeout_secs: u64,

    /// Storage backend
    #[arg(long, env = "REGISTRY_GC_BACKEND", value_enum, default_value_t = Backend::S3)]
    backend: Backend,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    S3,
    Memory,
}

impl Cli {
    fn policy(&self) -> CleanupPolicy {
        CleanupPolicy::builder()
            .threshold_hours(self.cleanup_hours)
            .dry_run(self.dry_run)
            .maybe_max_runtime(self.max_runtime_secs.map(Duration::from_secs))
            .build()
    }

    fn to_app_config(&self) -> Result<AppConfig> {
        let storage_backend = match self.backend {
            Backend::Memory => StorageBackend::InMemory(InMemoryRegistryStore::new()),
            Backend::S3 => {
                let endpoint = self
                    .endpoint
                    .clone()
                    .context("--endpoint is required for the S3 backend")?;
                let region = self
                    .region
                    .clone()
                    .context("--region is required for the S3 backend")?;
                let access_key = self
                    .access_key
                    .clone()
                    .context("--accesskey is required for the S3 backend")?;
                let secret_key = self
                    .secret_key
                    .clone()
                    .context("--secretkey is required for the S3 backend")?;

                StorageBackend::S3(S3Config {
                    endpoint,
                    region,
                    access_key,
                    secret_key,
                    operation_timeout: Duration::from_secs(self.operation_timeout_secs),
                })
            }
        };

        Ok(AppConfig {
            storage_backend,
            bucket: self.bucket.clone(),
            root_directory: self.root_directory.clone(),
            policy: self.policy(),
        })
    }

    fn init_logging(&self) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.log_level.to_lowercase()))
            .context("invalid log level")?;

        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
            .try_init()
            .context("failed to install tracing subscriber")?;

        Ok(())
    }
}

fn render(report: &GcReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report.to_string()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("failed to serialize report")
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    cli.init_logging()?;

    let config = cli.to_app_config()?;
    info!(
        bucket = %config.bucket,
        root_directory = config.root_directory.as_deref().unwrap_or(""),
        cleanup_hours = config.policy.threshold_hours,
        dry_run = config.policy.dry_run,
        "starting registry upload cleanup"
    );

    let services = AppBuilder::new(config)
        .with_clock(Arc::new(SystemClock))
        .build()
        .await
        .context("failed to build application")?;

    let report = match services.scanner.run().await {
        Ok(report) => report,
        Err(GcError::Aborted { report, source }) => {
            println!("{}", render(&report, cli.output)?);
            error!(error = %source, "garbage collection aborted");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e).context("garbage collection aborted"),
    };

    println!("{}", render(&report, cli.output)?);

    if report.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else {
        for repository in &report.incomplete {
            error!(prefix = %repository.prefix, reason = %repository.reason, "repository not fully swept");
        }
        Ok(ExitCode::from(2))
    }
}
