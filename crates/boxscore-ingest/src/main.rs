//! Ingestion binary for box-score reconstruction.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `boxscore-config.yaml` (or the path given as
//!    the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Build the precision model and the snapshot index
//! 4. Load every contest in the input directory
//! 5. When persisting, connect to `PostgreSQL` and seed the index with each
//!    contest's stored prefix
//! 6. Fold contests concurrently into the index
//! 7. Write the snapshots back to `PostgreSQL` when persisting
//! 8. Print one JSON report line per contest

use std::path::PathBuf;
use std::sync::Arc;

use boxscore_index::{PostgresConfig, PostgresPool, SnapshotIndex};
use boxscore_ingest::{IngestRunner, ServiceConfig, load_inputs};
use boxscore_temporal::PrecisionModel;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Default configuration file.
const DEFAULT_CONFIG_PATH: &str = "boxscore-config.yaml";

/// Application entry point for the ingestion service.
///
/// # Errors
///
/// Returns an error if configuration, input loading, ingestion or
/// persistence fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = if config_path.exists() {
        ServiceConfig::from_file(&config_path)?
    } else {
        ServiceConfig::parse("")?
    };

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        config = %config_path.display(),
        input_dir = %config.ingest.input_dir.display(),
        max_concurrent_folds = config.ingest.max_concurrent_folds,
        block_size = config.index.block_size,
        persist = config.infrastructure.persist,
        "boxscore-ingest starting"
    );

    // 3. Build the index.
    let model = PrecisionModel::new(&config.precision)?;
    let index = Arc::new(SnapshotIndex::new(config.index.clone(), model));

    // 4. Load inputs.
    let inputs = load_inputs(&config.ingest.input_dir)?;
    info!(contests = inputs.len(), "Contest inputs loaded");

    let runner = IngestRunner::new(Arc::clone(&index), config.ingest.clone())
        .with_periods(config.periods);

    // 5. Seed from the durable store.
    let pool = if config.infrastructure.persist {
        let pg_config = PostgresConfig::new(&config.infrastructure.postgres_url)
            .with_max_connections(config.infrastructure.max_connections);
        let pool = PostgresPool::connect(&pg_config).await?;
        pool.ensure_schema().await?;
        let seeded = runner.seed(&pool.snapshot_store(model), &inputs).await?;
        info!(rows = seeded, "Index seeded from store");
        Some(pool)
    } else {
        None
    };

    // 6. Ingest.
    let reports = runner.run(inputs).await?;

    // 7. Persist.
    if let Some(pool) = pool {
        let store = pool
            .snapshot_store(model)
            .with_batch_size(config.infrastructure.batch_size);
        let written = runner.persist(&store, &reports).await?;
        info!(rows = written, "Snapshots persisted");
        pool.close().await;
    }

    // 8. Report.
    for report in &reports {
        if !report.is_complete() {
            warn!(
                contest_id = %report.contest_id,
                last_sequence = ?report.last_sequence,
                "Contest ingested partially"
            );
        }
        println!("{}", serde_json::to_string(report)?);
    }

    Ok(())
}
