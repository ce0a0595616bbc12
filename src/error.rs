// src/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pose on line {line}: {source}")]
    Recording {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Pose estimation failed: {0}")]
    Estimator(String),
}

pub type Result<T> = std::result::Result<T, Error>;
