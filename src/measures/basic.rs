// src/measures/basic.rs
use std::num::NonZeroU32;

use ndarray::Array1;

use crate::error::{MeasureError, MeasureResult};
use crate::measures::signal::{find_peaks, trapezoid};
use crate::measures::{Direction, SweepMeasure};
use crate::recording::SweepView;
use crate::span::Span;

/// Baseline-subtract, crop to `region`, then flip by `direction`.
fn oriented_trace(
    sweep: &SweepView<'_>,
    region: &Span,
    baseline: &Span,
    direction: Direction,
) -> MeasureResult<Array1<f64>> {
    let region = region.to_samples(sweep.sample_rate_hz)?;
    let baseline = baseline.to_samples(sweep.sample_rate_hz)?;
    let trace = baseline.baseline(sweep.y)?;
    let cropped = region.crop(trace.view())?;
    Ok(cropped * direction.sign())
}

/// Largest deflection inside `region` after baselining.
#[derive(Clone, Debug, PartialEq)]
pub struct PeakMagnitude {
    pub region: Span,
    pub baseline: Span,
    pub direction: Direction,
}

impl PeakMagnitude {
    pub fn new(region: Span, baseline: Span, direction: Direction) -> Self {
        Self {
            region,
            baseline,
            direction,
        }
    }
}

impl Default for PeakMagnitude {
    fn default() -> Self {
        Self::new(Span::Full, Span::Null, Direction::Positive)
    }
}

impl SweepMeasure for PeakMagnitude {
    fn measure(&self, sweep: &SweepView<'_>) -> MeasureResult<f64> {
        let trace = oriented_trace(sweep, &self.region, &self.baseline, self.direction)?;
        trace
            .iter()
            .copied()
            .reduce(f64::max)
            .ok_or_else(|| MeasureError::no_result("peak region holds no samples"))
    }
}

/// Trapezoidal area of the baselined trace inside `region`, per millisecond.
#[derive(Clone, Debug, PartialEq)]
pub struct AreaUnderCurve {
    pub region: Span,
    pub baseline: Span,
    pub direction: Direction,
}

impl AreaUnderCurve {
    pub fn new(region: Span, baseline: Span, direction: Direction) -> Self {
        Self {
            region,
            baseline,
            direction,
        }
    }
}

impl Default for AreaUnderCurve {
    fn default() -> Self {
        Self::new(Span::Full, Span::Null, Direction::Negative)
    }
}

impl SweepMeasure for AreaUnderCurve {
    fn measure(&self, sweep: &SweepView<'_>) -> MeasureResult<f64> {
        let trace = oriented_trace(sweep, &self.region, &self.baseline, self.direction)?;
        let samples_per_ms = f64::from(sweep.sample_rate_hz) / 1000.0;
        Ok(trapezoid(trace.view()) / samples_per_ms)
    }
}

/// Action potentials per stimulus: local maxima above `threshold` in `region`.
#[derive(Clone, Debug, PartialEq)]
pub struct SpikeCount {
    pub region: Span,
    pub threshold: Option<f64>,
    pub stims_per_sweep: NonZeroU32,
}

impl SpikeCount {
    pub fn new(region: Span, threshold: Option<f64>, stims_per_sweep: NonZeroU32) -> Self {
        Self {
            region,
            threshold,
            stims_per_sweep,
        }
    }
}

impl Default for SpikeCount {
    fn default() -> Self {
        Self::new(Span::Full, None, NonZeroU32::MIN)
    }
}

impl SweepMeasure for SpikeCount {
    fn measure(&self, sweep: &SweepView<'_>) -> MeasureResult<f64> {
        let region = self.region.to_samples(sweep.sample_rate_hz)?;
        let trace = region.crop(sweep.y)?;
        let peaks = find_peaks(trace.view(), self.threshold);
        Ok(peaks.len() as f64 / f64::from(self.stims_per_sweep.get()))
    }
}

/// Number of events (local maxima) in the baselined, oriented trace.
#[derive(Clone, Debug, PartialEq)]
pub struct EventCount {
    pub region: Span,
    pub baseline: Span,
    pub direction: Direction,
    /// Minimum peak height; every local maximum counts when unset.
    pub height: Option<f64>,
}

impl Default for EventCount {
    fn default() -> Self {
        Self {
            region: Span::Full,
            baseline: Span::Null,
            direction: Direction::Positive,
            height: None,
        }
    }
}

impl SweepMeasure for EventCount {
    fn measure(&self, sweep: &SweepView<'_>) -> MeasureResult<f64> {
        let trace = oriented_trace(sweep, &self.region, &self.baseline, self.direction)?;
        Ok(find_peaks(trace.view(), self.height).len() as f64)
    }
}
