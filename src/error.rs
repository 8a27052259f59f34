use std::io;
use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Raised when an input table cannot be turned into raw records.
/// `encode` itself never fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("input is missing required column {column:?}")]
    MissingColumn { column: &'static str },
    #[error("row {row}: required field {field:?} is empty")]
    MissingField { row: usize, field: &'static str },
}

/// The classifier could not score the feature matrix. Usually means the
/// encoder and the loaded model disagree on the feature schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("feature schema mismatch: classifier expects {expected} columns, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("classifier returned {classes} class probabilities, no positive class")]
    MissingPositiveClass { classes: usize },
    #[error("classifier returned {actual} rows for {expected} inputs")]
    RowCountMismatch { expected: usize, actual: usize },
    #[error("classifier returned probability {value} outside [0, 1]")]
    InvalidProbability { value: f64 },
    #[error("classifier rejected input: {0}")]
    Rejected(String),
}

/// Attribution failed. The probability of the same call is still valid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("explanation unavailable: {reason}")]
pub struct ExplanationUnavailable {
    pub reason: String,
}

impl ExplanationUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("could not read model artifact {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("model declares {found} features, encoder produces {expected}")]
    FeatureCount { expected: usize, found: usize },
    #[error("model feature {index} is {found:?}, encoder produces {expected:?}")]
    SchemaMismatch {
        index: usize,
        expected: &'static str,
        found: String,
    },
    #[error("tree {tree} node {node}: {message}")]
    MalformedTree {
        tree: usize,
        node: usize,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum StrokeRiskError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("invalid settings: {0}")]
    Settings(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StrokeRiskError>;
