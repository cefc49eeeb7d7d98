use std::path::PathBuf;
use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] ConfigError),
    #[error("Snapshot Error: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("Injector Error: {0}")]
    Injector(#[from] InjectorError),
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Director task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// Detection record errors. These never escape a tick, the loader boundary
// turns them into "no snapshot".
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Detections directory does not exist: {0}")]
    MissingDirectory(PathBuf),
    #[error("No detection records found in {0}")]
    NoRecords(PathBuf),
    #[error("Failed to read detection record {1}: {0}")]
    Io(std::io::Error, PathBuf),
    #[error("Failed to parse detection record {1}: {0}")]
    Parse(serde_json::Error, PathBuf),
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: i64, found: i64 },
    #[error("Invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: i64, height: i64 },
    #[error("Detection object {0} has neither a center nor a bounding box")]
    InvalidObject(usize),
}

#[derive(Error, Debug)]
pub enum InjectorError {
    #[error("Failed to write intent: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize intent: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Intent rejected by injector: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
