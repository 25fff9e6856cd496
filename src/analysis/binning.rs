// src/analysis/binning.rs
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::analysis::table::CellValue;

/// How a per-sweep result list is collapsed before it is stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Binning {
    /// Store the raw list.
    #[default]
    Off,
    /// Reduce the whole list to one value.
    Whole,
    /// Reduce consecutive chunks of this size; a trailing partial chunk is dropped.
    Chunks(NonZeroUsize),
}

impl From<Option<usize>> for Binning {
    fn from(bin_size: Option<usize>) -> Self {
        match bin_size {
            None => Binning::Off,
            Some(n) => NonZeroUsize::new(n).map_or(Binning::Whole, Binning::Chunks),
        }
    }
}

impl Binning {
    pub fn apply(self, values: Vec<f64>, reducer: &Reducer) -> CellValue {
        match self {
            Binning::Off => CellValue::Series(values),
            Binning::Whole => CellValue::Scalar(reducer.reduce(&values)),
            Binning::Chunks(size) => CellValue::Series(
                values
                    .chunks_exact(size.get())
                    .map(|chunk| reducer.reduce(chunk))
                    .collect(),
            ),
        }
    }
}

/// Function applied to each bin.
#[derive(Clone, Default)]
pub enum Reducer {
    #[default]
    Mean,
    Median,
    Sum,
    Min,
    Max,
    First,
    Last,
    Custom(Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>),
}

impl Reducer {
    pub fn custom(func: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) -> Self {
        Reducer::Custom(Arc::new(func))
    }

    /// Reduce a bin. Empty bins give NaN, except for `Sum` which gives zero.
    pub fn reduce(&self, values: &[f64]) -> f64 {
        match self {
            Reducer::Mean if values.is_empty() => f64::NAN,
            Reducer::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Reducer::Median => median(values),
            Reducer::Sum => values.iter().sum(),
            Reducer::Min => values.iter().copied().reduce(f64::min).unwrap_or(f64::NAN),
            Reducer::Max => values.iter().copied().reduce(f64::max).unwrap_or(f64::NAN),
            Reducer::First => values.first().copied().unwrap_or(f64::NAN),
            Reducer::Last => values.last().copied().unwrap_or(f64::NAN),
            Reducer::Custom(func) => func(values),
        }
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reducer::Mean => "Mean",
            Reducer::Median => "Median",
            Reducer::Sum => "Sum",
            Reducer::Min => "Min",
            Reducer::Max => "Max",
            Reducer::First => "First",
            Reducer::Last => "Last",
            Reducer::Custom(_) => "Custom",
        };
        f.write_str(name)
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
