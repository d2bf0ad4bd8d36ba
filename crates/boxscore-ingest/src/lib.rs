//! Ingestion service for box-score reconstruction.
//!
//! Loads contest event logs and rosters, folds contests concurrently into a
//! shared [`SnapshotIndex`](boxscore_index::SnapshotIndex), audits the
//! result, and optionally persists it to `PostgreSQL`.
//!
//! # Modules
//!
//! - [`config`] -- `boxscore-config.yaml` loading
//! - [`runner`] -- The concurrent [`IngestRunner`]

pub mod config;
pub mod runner;

pub use config::{ConfigError, IngestConfig, InfrastructureConfig, LoggingConfig, ServiceConfig};
pub use runner::{ContestInput, ContestReport, IngestRunner, RunnerError, load_inputs};
