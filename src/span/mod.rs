// src/span/mod.rs
//! Regions of interest over sampled 1-D traces.
//!
//! A [`Span`] is either a set of sorted, merged `[start, end)` regions in a
//! [`TimeUnit`], or one of two degenerate variants: [`Span::Null`] (no
//! samples) and [`Span::Full`] (the whole trace). Spans are converted to
//! sample units for a given recording rate before they can crop or baseline
//! an array; conversion returns a new span and is a no-op when repeated.
pub mod unit;

use std::fmt;

use ndarray::{s, Array1, ArrayView1};

use crate::error::SpanError;
pub use unit::TimeUnit;

/// Closed-open index range `(start, end)`.
pub type Region = (i64, i64);

/// Anything that can describe one or more regions.
pub trait IntoRegions {
    fn into_regions(self) -> Vec<Region>;
}

impl IntoRegions for Region {
    fn into_regions(self) -> Vec<Region> {
        vec![self]
    }
}

impl IntoRegions for Vec<Region> {
    fn into_regions(self) -> Vec<Region> {
        self
    }
}

impl IntoRegions for &[Region] {
    fn into_regions(self) -> Vec<Region> {
        self.to_vec()
    }
}

impl<const N: usize> IntoRegions for [Region; N] {
    fn into_regions(self) -> Vec<Region> {
        self.to_vec()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundedSpan {
    regions: Vec<Region>,
    unit: TimeUnit,
}

impl BoundedSpan {
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn unit(&self) -> &TimeUnit {
        &self.unit
    }

    fn converted(&self, unit: &TimeUnit) -> Result<Vec<Region>, SpanError> {
        let (old, new) = (self.unit.factor(), unit.factor());
        let rescale = |edge: i64| {
            edge.checked_mul(old)
                .map(|micros| micros.div_euclid(new))
                .ok_or_else(|| SpanError::Overflow {
                    edge,
                    unit: self.unit.to_string(),
                })
        };
        self.regions
            .iter()
            .map(|&(start, end)| Ok((rescale(start)?, rescale(end)?)))
            .collect()
    }

    fn cropped(&self, trace: ArrayView1<'_, f64>) -> Array1<f64> {
        let len = trace.len() as i64;
        let mut out = Vec::new();
        for &(start, end) in &self.regions {
            let start = start.clamp(0, len) as usize;
            let end = end.clamp(0, len) as usize;
            if start < end {
                out.extend(trace.slice(s![start..end]).iter().copied());
            }
        }
        Array1::from(out)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Span {
    Bounded(BoundedSpan),
    /// Matches no portion of the trace.
    Null,
    /// Matches the entire trace.
    Full,
}

impl Span {
    /// Build a span from vocabulary unit `unit` (`us`, `ms`, `s`, `sec`, `min`).
    pub fn new(region: impl IntoRegions, unit: &str) -> Result<Self, SpanError> {
        Self::in_unit(region, TimeUnit::from_name(unit)?)
    }

    /// Build a span in an arbitrary unit given its size in microseconds.
    pub fn with_factor(region: impl IntoRegions, unit: &str, factor: i64) -> Result<Self, SpanError> {
        Self::in_unit(region, TimeUnit::parse(unit, Some(factor))?)
    }

    pub fn in_unit(region: impl IntoRegions, unit: TimeUnit) -> Result<Self, SpanError> {
        if unit.factor() <= 0 {
            return Err(SpanError::InvalidFactor(unit.factor()));
        }
        let regions = region.into_regions();
        if let Some(&(start, end)) = regions.iter().find(|(start, end)| start > end) {
            return Err(SpanError::ReversedRegion { start, end });
        }
        Ok(Span::Bounded(BoundedSpan {
            regions: merge_regions(regions),
            unit,
        }))
    }

    pub fn null() -> Self {
        Span::Null
    }

    pub fn full() -> Self {
        Span::Full
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Span::Null)
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Span::Full)
    }

    /// Regions of a bounded span; empty for the degenerate variants.
    pub fn regions(&self) -> &[Region] {
        match self {
            Span::Bounded(bounded) => bounded.regions(),
            Span::Null | Span::Full => &[],
        }
    }

    pub fn unit(&self) -> Option<&TimeUnit> {
        match self {
            Span::Bounded(bounded) => Some(bounded.unit()),
            Span::Null | Span::Full => None,
        }
    }

    pub fn factor(&self) -> Option<i64> {
        self.unit().map(TimeUnit::factor)
    }

    /// Whether the span can be applied to an array.
    pub fn is_in_samples(&self) -> bool {
        match self {
            Span::Bounded(bounded) => bounded.unit.is_samples(),
            Span::Null | Span::Full => true,
        }
    }

    /// Union of two spans, expressed in their coarsest common unit.
    pub fn union(&self, other: &Span) -> Result<Span, SpanError> {
        match (self, other) {
            (Span::Full, _) | (_, Span::Full) => Ok(Span::Full),
            (Span::Null, span) | (span, Span::Null) => Ok(span.clone()),
            (Span::Bounded(left), Span::Bounded(right)) => {
                let unit = TimeUnit::common(&left.unit, &right.unit)?;
                let mut regions = left.converted(&unit)?;
                regions.extend(right.converted(&unit)?);
                Span::in_unit(regions, unit)
            }
        }
    }

    /// Region endpoints rescaled to `unit` with floor division, one output
    /// region per input region and no re-merge.
    ///
    /// The rescaling is lossy when the target unit is coarser than the edges
    /// it rounds, so converting back does not always restore the input.
    pub fn convert_regions(&self, unit: &TimeUnit) -> Result<Vec<Region>, SpanError> {
        if unit.factor() <= 0 {
            return Err(SpanError::InvalidFactor(unit.factor()));
        }
        match self {
            Span::Bounded(bounded) => bounded.converted(unit),
            Span::Null | Span::Full => Ok(Vec::new()),
        }
    }

    /// The span rescaled to `unit`; regions that meet after rounding are merged.
    pub fn convert_to(&self, unit: &TimeUnit) -> Result<Span, SpanError> {
        match self {
            Span::Bounded(_) => Span::in_unit(self.convert_regions(unit)?, unit.clone()),
            Span::Null | Span::Full => Ok(self.clone()),
        }
    }

    /// The span in sample units for a recording sampled at `sample_rate_hz`.
    ///
    /// Returns an identical span when already converted for that rate.
    pub fn to_samples(&self, sample_rate_hz: u32) -> Result<Span, SpanError> {
        let Span::Bounded(bounded) = self else {
            return Ok(self.clone());
        };
        let unit = TimeUnit::samples(sample_rate_hz)?;
        if bounded.unit == unit {
            return Ok(self.clone());
        }
        self.convert_to(&unit)
    }

    /// Concatenation of the trace slices covered by the span, in region order.
    pub fn crop(&self, trace: ArrayView1<'_, f64>) -> Result<Array1<f64>, SpanError> {
        match self {
            Span::Null => Ok(Array1::zeros(0)),
            Span::Full => Ok(trace.to_owned()),
            Span::Bounded(bounded) => {
                self.ensure_samples()?;
                Ok(bounded.cropped(trace))
            }
        }
    }

    /// The full trace minus the mean of its cropped portion.
    ///
    /// An empty crop has a NaN mean, which propagates into every sample.
    pub fn baseline(&self, trace: ArrayView1<'_, f64>) -> Result<Array1<f64>, SpanError> {
        let reference = match self {
            Span::Null => return Ok(trace.to_owned()),
            Span::Full => trace.to_owned(),
            Span::Bounded(bounded) => {
                self.ensure_samples()?;
                bounded.cropped(trace)
            }
        };
        let mean = reference.mean().unwrap_or(f64::NAN);
        Ok(trace.mapv(|value| value - mean))
    }

    fn ensure_samples(&self) -> Result<(), SpanError> {
        match self {
            Span::Bounded(bounded) if !bounded.unit.is_samples() => Err(SpanError::NotInSamples {
                unit: bounded.unit.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Span::Null => f.write_str("span representing no portion of the trace"),
            Span::Full => f.write_str("span including the entire trace"),
            Span::Bounded(bounded) => {
                f.write_str("span over")?;
                for (start, end) in &bounded.regions {
                    write!(f, " [{start}, {end})")?;
                }
                write!(f, " in {}", bounded.unit)
            }
        }
    }
}

/// Sort regions and join any that overlap or touch.
fn merge_regions(mut regions: Vec<Region>) -> Vec<Region> {
    regions.sort_unstable();
    let mut merged: Vec<Region> = Vec::with_capacity(regions.len());
    for (start, end) in regions {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}
