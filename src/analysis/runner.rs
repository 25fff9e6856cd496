// src/analysis/runner.rs
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::binning::{Binning, Reducer};
use crate::analysis::table::{CellValue, ColumnKey, NumericType, ResultsTable};
use crate::error::{AnalysisError, MeasureError, MeasureResult};
use crate::measures::{EachSweep, Measurement, SweepMeasure};
use crate::recording::{Recording, RecordingSource};

/// How the raw list of a measurement is binned and stored.
#[derive(Clone, Debug, Default)]
pub struct MeasureOptions {
    pub binning: Binning,
    pub reducer: Reducer,
    pub dtype: NumericType,
}

impl MeasureOptions {
    /// `None` keeps the raw list, `Some(0)` reduces it whole, `Some(n)` bins by `n`.
    pub fn binned(bin_size: Option<usize>) -> Self {
        Self {
            binning: bin_size.into(),
            ..Self::default()
        }
    }

    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn with_dtype(mut self, dtype: NumericType) -> Self {
        self.dtype = dtype;
        self
    }
}

struct RegisteredMeasure {
    name: String,
    measurement: Box<dyn Measurement>,
    options: MeasureOptions,
}

impl RegisteredMeasure {
    fn evaluate(&self, recording: &Recording) -> MeasureResult<CellValue> {
        let raw = self.measurement.run(recording)?;
        let cell = self.options.binning.apply(raw, &self.options.reducer);
        Ok(cell.coerce(self.options.dtype))
    }
}

/// One recording of a batch: the row id and where to load it from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub id: String,
    pub filepath: PathBuf,
}

/// Ordered recordings to process.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordingBatch {
    entries: Vec<BatchEntry>,
}

impl RecordingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: impl Into<String>, filepath: impl Into<PathBuf>) -> &mut Self {
        self.entries.push(BatchEntry {
            id: id.into(),
            filepath: filepath.into(),
        });
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<I, P> FromIterator<(I, P)> for RecordingBatch
where
    I: Into<String>,
    P: Into<PathBuf>,
{
    fn from_iter<T: IntoIterator<Item = (I, P)>>(iter: T) -> Self {
        let mut batch = Self::new();
        for (id, filepath) in iter {
            batch.push(id, filepath);
        }
        batch
    }
}

/// Results of one or more analyses over a batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub table: ResultsTable,
    pub errors: Vec<String>,
}

impl AnalysisReport {
    pub fn merge(&mut self, other: AnalysisReport) {
        self.table.merge(other.table);
        self.errors.extend(other.errors);
    }

    fn push_error(&mut self, message: String) {
        log::warn!("{message}");
        self.errors.push(message);
    }
}

/// A named, ordered set of measurements applied to every recording of a batch.
pub struct Analysis {
    name: String,
    measures: Vec<RegisteredMeasure>,
}

impl Analysis {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            measures: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn measure_names(&self) -> impl Iterator<Item = &str> {
        self.measures.iter().map(|measure| measure.name.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = ColumnKey> + '_ {
        self.measure_names()
            .map(move |name| ColumnKey::new(&self.name, name))
    }

    /// Register a measurement. A name already in use is rejected and the
    /// existing registration is left untouched.
    pub fn add_measure(
        &mut self,
        name: impl Into<String>,
        measurement: impl Measurement + 'static,
        options: MeasureOptions,
    ) -> Result<(), AnalysisError> {
        let name = name.into();
        if self.measures.iter().any(|measure| measure.name == name) {
            return Err(AnalysisError::DuplicateMeasure { name });
        }
        self.measures.push(RegisteredMeasure {
            name,
            measurement: Box::new(measurement),
            options,
        });
        Ok(())
    }

    /// Shorthand for registering a per-sweep measure through [`EachSweep`].
    pub fn add_sweep_measure(
        &mut self,
        name: impl Into<String>,
        measure: impl SweepMeasure + 'static,
        options: MeasureOptions,
    ) -> Result<(), AnalysisError> {
        self.add_measure(name, EachSweep::new(measure), options)
    }

    pub fn process<S>(&self, source: &S, batch: &RecordingBatch) -> AnalysisReport
    where
        S: RecordingSource + ?Sized,
    {
        let mut report = AnalysisReport {
            table: ResultsTable::new(self.columns()),
            errors: Vec::new(),
        };
        for entry in batch.iter() {
            log::info!("{}: opening {}", self.name, entry.filepath.display());
            let recording = match source.open(&entry.filepath) {
                Ok(recording) => recording,
                Err(err) => {
                    report.push_error(load_error(&entry.filepath, &err));
                    continue;
                }
            };
            self.measure_recording(&entry.id, &recording, &mut report);
        }
        report
    }

    fn measure_recording(&self, id: &str, recording: &Recording, report: &mut AnalysisReport) {
        for measure in &self.measures {
            log::debug!("{}: measuring {} on {id}", self.name, measure.name);
            let key = ColumnKey::new(&self.name, &measure.name);
            match measure.evaluate(recording) {
                Ok(cell) => report.table.set(id, key, cell),
                Err(MeasureError::NoResult(reason)) => {
                    log::debug!("{id}/{}: {reason}", measure.name);
                    report.table.set(id, key, CellValue::NoResult);
                }
                Err(err) => report.push_error(format!(
                    "Recording {id} is invalid for measure {}: {err}",
                    measure.name
                )),
            }
        }
    }
}

fn load_error(path: &Path, cause: &dyn std::fmt::Display) -> String {
    format!("{} does not exist or cannot be loaded: {cause}", path.display())
}
