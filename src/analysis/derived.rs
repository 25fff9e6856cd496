// src/analysis/derived.rs
//! Row-wise measures computed from the columns of an existing results table.
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::analysis::table::{CellValue, ColumnKey, NumericType, ResultsTable};
use crate::error::AnalysisError;

pub const DEFAULT_GROUP: &str = "Derived_Measures";

pub type RowFunction = Arc<dyn Fn(&[CellValue]) -> f64 + Send + Sync>;

struct DerivedMeasure {
    name: String,
    inputs: Vec<ColumnKey>,
    func: RowFunction,
    dtype: NumericType,
}

/// A named set of derived measures; its output columns share the set's name as group.
pub struct DerivedMeasures {
    group: String,
    measures: Vec<DerivedMeasure>,
}

impl Default for DerivedMeasures {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP)
    }
}

impl DerivedMeasures {
    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            measures: Vec::new(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Register `func` over the cells at `inputs`, each a `(group, column)` pair.
    pub fn add_measure<I, G, C, F>(
        &mut self,
        inputs: I,
        func: F,
        name: impl Into<String>,
        dtype: NumericType,
    ) -> Result<(), AnalysisError>
    where
        I: IntoIterator<Item = (G, C)>,
        G: Into<String>,
        C: Into<String>,
        F: Fn(&[CellValue]) -> f64 + Send + Sync + 'static,
    {
        self.add_row_function(inputs, Arc::new(func), name, dtype)
    }

    pub fn add_row_function<I, G, C>(
        &mut self,
        inputs: I,
        func: RowFunction,
        name: impl Into<String>,
        dtype: NumericType,
    ) -> Result<(), AnalysisError>
    where
        I: IntoIterator<Item = (G, C)>,
        G: Into<String>,
        C: Into<String>,
    {
        let name = name.into();
        if self.measures.iter().any(|measure| measure.name == name) {
            return Err(AnalysisError::DuplicateMeasure { name });
        }
        let inputs = inputs
            .into_iter()
            .map(|(group, column)| {
                let (group, column) = (group.into(), column.into());
                if group.is_empty() || column.is_empty() {
                    Err(AnalysisError::InvalidColumnRef { group, column })
                } else {
                    Ok(ColumnKey::new(group, column))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.measures.push(DerivedMeasure {
            name,
            inputs,
            func,
            dtype,
        });
        Ok(())
    }

    /// One output row per input row, in the same order.
    pub fn process(&self, results: &ResultsTable) -> ResultsTable {
        let mut derived = ResultsTable::new(
            self.measures
                .iter()
                .map(|measure| ColumnKey::new(&self.group, &measure.name)),
        );
        for row in results.rows() {
            for measure in &self.measures {
                let cells: Vec<CellValue> = measure
                    .inputs
                    .iter()
                    .map(|key| row.get(key).cloned().unwrap_or(CellValue::NoResult))
                    .collect();
                let value = measure.dtype.coerce((measure.func)(cells.as_slice()));
                let cell = if value.is_nan() {
                    CellValue::NoResult
                } else {
                    CellValue::Scalar(value)
                };
                derived.set(row.id(), ColumnKey::new(&self.group, &measure.name), cell);
            }
        }
        derived
    }
}

impl fmt::Debug for DerivedMeasures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedMeasures")
            .field("group", &self.group)
            .field(
                "measures",
                &self.measures.iter().map(|m| &m.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Row functions available by name in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinRowFunction {
    /// First input divided by the second.
    Ratio,
    /// First input minus the second.
    Difference,
    Sum,
    Mean,
}

impl BuiltinRowFunction {
    pub fn function(self) -> RowFunction {
        match self {
            BuiltinRowFunction::Ratio => Arc::new(|cells: &[CellValue]| pair(cells, |a, b| a / b)),
            BuiltinRowFunction::Difference => Arc::new(|cells: &[CellValue]| pair(cells, |a, b| a - b)),
            BuiltinRowFunction::Sum => {
                Arc::new(|cells: &[CellValue]| cells.iter().map(CellValue::as_scalar).sum())
            }
            BuiltinRowFunction::Mean => Arc::new(|cells: &[CellValue]| {
                if cells.is_empty() {
                    return f64::NAN;
                }
                cells.iter().map(CellValue::as_scalar).sum::<f64>() / cells.len() as f64
            }),
        }
    }
}

fn pair(cells: &[CellValue], op: impl Fn(f64, f64) -> f64) -> f64 {
    match cells {
        [a, b, ..] => op(a.as_scalar(), b.as_scalar()),
        _ => f64::NAN,
    }
}
