// src/lib.rs
//! Sweep measurements for multi-sweep electrophysiology recordings.
//!
//! Windows of a sweep are described by [`span::Span`] values, measured per
//! sweep by [`measures`], and collected across a batch of recordings by
//! [`analysis::Analysis`].
pub mod analysis;
pub mod config;
pub mod error;
pub mod measures;
pub mod recording;
pub mod span;

pub use analysis::{Analysis, AnalysisReport, DerivedMeasures, RecordingBatch, ResultsTable};
pub use config::PincerConfig;
pub use error::{AnalysisError, ConfigError, MeasureError, RecordingError, SpanError};
pub use span::Span;
