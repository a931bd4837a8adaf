// Error handling for the ECLIPSE file reader

use crate::core::constants::ArrayType;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EclError>;

#[derive(Error, Debug)]
pub enum EclError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Not an ECLIPSE binary file: {path}: {reason}")]
    NotAContainerFile { path: PathBuf, reason: String },

    #[error("Malformed record at offset {offset}: {reason}")]
    MalformedRecord { offset: u64, reason: String },

    #[error("Truncated record at offset {offset}")]
    TruncatedRecord { offset: u64 },

    #[error("Unknown report step: {0}")]
    UnknownReportStep(i32),

    #[error("Unknown summary vector: {0}")]
    UnknownVector(String),

    #[error("Non-monotonic time: {next} s follows {previous} s")]
    NonMonotonicTime { previous: f64, next: f64 },

    #[error("Value {target} outside observed range [{min}, {max}]")]
    ValueNotBracketed { target: f64, min: f64, max: f64 },

    #[error("Array not found: {name} (occurrence {occurrence})")]
    ArrayNotFound { name: String, occurrence: usize },

    #[error("Array {name} has type {actual}, requested {expected}")]
    ArrayTypeMismatch {
        name: String,
        expected: ArrayType,
        actual: ArrayType,
    },

    #[error("Invalid summary key: {0}")]
    InvalidKey(String),

    #[error("Expected {expected} parameter values, got {actual}")]
    ParameterCount { expected: usize, actual: usize },

    #[error("Invalid simulation time: {0} s")]
    InvalidTime(f64),

    #[error("Circular RESTART reference at {0}")]
    CircularRestart(PathBuf),

    #[error("Summary series is empty")]
    EmptySeries,

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid key pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl EclError {
    pub fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            offset,
            reason: reason.into(),
        }
    }

    pub fn not_container(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::NotAContainerFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn array_not_found(name: impl Into<String>, occurrence: usize) -> Self {
        Self::ArrayNotFound {
            name: name.into(),
            occurrence,
        }
    }
}
