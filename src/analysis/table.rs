// src/analysis/table.rs
use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Value stored in one results cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Scalar(f64),
    /// Unbinned or chunk-binned per-sweep values.
    Series(Vec<f64>),
    /// The recording was valid but the measurement produced nothing (NaN).
    NoResult,
}

impl CellValue {
    /// The scalar value, NaN for anything else.
    pub fn as_scalar(&self) -> f64 {
        match self {
            CellValue::Scalar(value) => *value,
            CellValue::Series(_) | CellValue::NoResult => f64::NAN,
        }
    }

    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            CellValue::Series(values) => Some(values),
            _ => None,
        }
    }

    pub fn is_no_result(&self) -> bool {
        matches!(self, CellValue::NoResult)
    }

    pub fn coerce(self, dtype: NumericType) -> Self {
        match self {
            CellValue::Scalar(value) => CellValue::Scalar(dtype.coerce(value)),
            CellValue::Series(values) => {
                CellValue::Series(values.into_iter().map(|v| dtype.coerce(v)).collect())
            }
            CellValue::NoResult => CellValue::NoResult,
        }
    }
}

/// Numeric type a column is stored as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericType {
    #[default]
    Float64,
    Float32,
    /// Truncated toward zero; NaN stays NaN.
    Int64,
}

impl NumericType {
    pub fn coerce(self, value: f64) -> f64 {
        match self {
            NumericType::Float64 => value,
            NumericType::Float32 => value as f32 as f64,
            NumericType::Int64 if value.is_finite() => value.trunc(),
            NumericType::Int64 => value,
        }
    }
}

/// Column address: the analysis (or derived set) name plus the measure name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnKey {
    pub group: String,
    pub name: String,
}

impl ColumnKey {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultRow {
    id: String,
    cells: BTreeMap<ColumnKey, CellValue>,
}

impl ResultRow {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &ColumnKey) -> Option<&CellValue> {
        self.cells.get(key)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (key, value) in &self.cells {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}

/// Recordings by measurement. Rows keep first-write order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResultsTable {
    #[serde(serialize_with = "serialize_columns")]
    columns: Vec<ColumnKey>,
    rows: Vec<ResultRow>,
}

fn serialize_columns<S: Serializer>(columns: &[ColumnKey], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(columns.iter().map(ToString::to_string))
}

impl ResultsTable {
    pub fn new(columns: impl IntoIterator<Item = ColumnKey>) -> Self {
        let mut table = Self::default();
        for key in columns {
            table.add_column(key);
        }
        table
    }

    pub fn add_column(&mut self, key: ColumnKey) {
        if !self.columns.contains(&key) {
            self.columns.push(key);
        }
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn row(&self, id: &str) -> Option<&ResultRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn get(&self, id: &str, key: &ColumnKey) -> Option<&CellValue> {
        self.row(id).and_then(|row| row.get(key))
    }

    /// Write a cell, creating the row and column when missing.
    pub fn set(&mut self, id: &str, key: ColumnKey, value: CellValue) {
        self.add_column(key.clone());
        let index = match self.rows.iter().position(|row| row.id == id) {
            Some(index) => index,
            None => {
                self.rows.push(ResultRow {
                    id: id.to_owned(),
                    cells: BTreeMap::new(),
                });
                self.rows.len() - 1
            }
        };
        self.rows[index].cells.insert(key, value);
    }

    /// Outer join on recording id; cells of `other` win on conflict.
    pub fn merge(&mut self, other: ResultsTable) {
        for key in other.columns {
            self.add_column(key);
        }
        for row in other.rows {
            for (key, value) in row.cells {
                self.set(&row.id, key, value);
            }
        }
    }
}
