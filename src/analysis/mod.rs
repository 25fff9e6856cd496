// src/analysis/mod.rs
//! Batch analysis: registered measurements, binning, result tables and
//! measures derived from them.
pub mod binning;
pub mod derived;
pub mod presets;
pub mod runner;
pub mod table;

pub use binning::{Binning, Reducer};
pub use derived::{BuiltinRowFunction, DerivedMeasures, RowFunction};
pub use presets::PairedPulseSpans;
pub use runner::{Analysis, AnalysisReport, BatchEntry, MeasureOptions, RecordingBatch};
pub use table::{CellValue, ColumnKey, NumericType, ResultRow, ResultsTable};
