//! Sessionizer
//!
//! Batch job turning raw page-view events into per-visitor sessions:
//! - Fetch the event batch from an HTTP endpoint or a JSON file
//! - Group, order and window events into sessions
//! - Deliver `{"sessionsByUser": ...}` to an HTTP endpoint or a JSON file

use anyhow::{Context, Result};
use tracing::{error, info};
use validator::Validate;

use pipeline::{Pipeline, PipelineConfig};
use session_core::{SessionConfig, Sessionizer};
use telemetry::{init_tracing_from_env, metrics};
use transport::{build_sink, build_source, EndpointConfig};

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    session: SessionConfig,

    #[serde(default)]
    source: EndpointConfig,

    #[serde(default)]
    sink: EndpointConfig,

    #[serde(default)]
    pipeline: PipelineConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting sessionizer v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    config
        .pipeline
        .validate()
        .context("Invalid pipeline configuration")?;

    info!(
        inactivity_threshold_ms = config.session.inactivity_threshold_ms,
        workers = config.pipeline.workers,
        max_retries = config.pipeline.max_retries,
        "Loaded configuration"
    );

    let source = build_source(&config.source).context("Invalid source configuration")?;
    let sink = build_sink(&config.sink).context("Invalid sink configuration")?;

    let pipeline = Pipeline::with_config(
        source,
        sink,
        Sessionizer::new(config.session),
        config.pipeline.clone(),
    );

    let outcome = pipeline.run().await;
    metrics().log_snapshot();

    match outcome {
        Ok(report) => {
            info!(
                run_id = %report.run_id,
                sessions = report.sessions,
                "Success: sessions delivered"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Sessionizer run failed");
            Err(e).context("Sessionizer run failed")
        }
    }
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("SESSIONIZER")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides; nested parsing of underscored field names is unreliable
    if let Ok(url) = std::env::var("SESSIONIZER_SOURCE_URL") {
        config.source.url = Some(url);
        config.source.path = None;
    }
    if let Ok(path) = std::env::var("SESSIONIZER_SOURCE_PATH") {
        config.source.path = Some(path.into());
        config.source.url = None;
    }
    if let Ok(url) = std::env::var("SESSIONIZER_SINK_URL") {
        config.sink.url = Some(url);
        config.sink.path = None;
    }
    if let Ok(path) = std::env::var("SESSIONIZER_SINK_PATH") {
        config.sink.path = Some(path.into());
        config.sink.url = None;
    }
    if let Ok(threshold) = std::env::var("SESSIONIZER_INACTIVITY_THRESHOLD_MS") {
        config.session.inactivity_threshold_ms = threshold
            .parse()
            .context("SESSIONIZER_INACTIVITY_THRESHOLD_MS must be an integer")?;
    }
    if let Ok(workers) = std::env::var("SESSIONIZER_WORKERS") {
        config.pipeline.workers = workers
            .parse()
            .context("SESSIONIZER_WORKERS must be an integer")?;
    }

    Ok(config)
}
