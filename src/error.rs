// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    #[error("{0} is not a span unit (expected one of us, ms, s, sec, min)")]
    UnknownUnit(String),
    #[error("unit {0} is outside the span vocabulary and needs an explicit factor")]
    MissingFactor(String),
    #[error("unit factor must be positive, got {0}")]
    InvalidFactor(i64),
    #[error("region ({start}, {end}) ends before it starts")]
    ReversedRegion { start: i64, end: i64 },
    #[error("sample rate {0} Hz cannot be expressed in whole microseconds per sample")]
    InvalidSampleRate(u32),
    #[error("unit must be samples to apply a span to an array, span is in {unit}")]
    NotInSamples { unit: String },
    #[error("spans in {left} and {right} do not share a unit system")]
    IncompatibleUnits { left: String, right: String },
    #[error("edge {edge} in {unit} is too large to rescale")]
    Overflow { edge: i64, unit: String },
}

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("{0} does not exist")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Outcome signals a measurement can raise instead of a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasureError {
    /// Expected omission; the sweep (or cell) simply has no value.
    #[error("no result: {0}")]
    NoResult(String),
    /// The recording breaks a structural assumption of the measurement.
    #[error("{0}")]
    InvalidRecording(String),
    #[error(transparent)]
    Span(#[from] SpanError),
}

impl MeasureError {
    pub fn no_result(reason: impl Into<String>) -> Self {
        MeasureError::NoResult(reason.into())
    }
    pub fn invalid(reason: impl Into<String>) -> Self {
        MeasureError::InvalidRecording(reason.into())
    }
}

pub type MeasureResult<T> = Result<T, MeasureError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// Registration would silently replace an existing entry.
    #[error("{name} already exists as a measure")]
    DuplicateMeasure { name: String },
    #[error("measure input ({group:?}, {column:?}) must name both a group and a column")]
    InvalidColumnRef { group: String, column: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Span(#[from] SpanError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("direction must be 1 or -1, got {0}")]
    InvalidDirection(i32),
    #[error("stims per sweep must be greater than zero")]
    InvalidStimCount,
}
