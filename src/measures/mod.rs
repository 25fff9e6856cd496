// src/measures/mod.rs
//! Per-sweep measurements and the adapters that run them over a recording.
pub mod basic;
pub mod ramp;
pub mod signal;
pub mod sweep;

use crate::error::{ConfigError, MeasureResult};
use crate::recording::{SweepAttribute, SweepView};

pub use basic::{AreaUnderCurve, EventCount, PeakMagnitude, SpikeCount};
pub use ramp::{FirstThreeRatio, InputResistance, Ramp, Rheobase, SpikeThreshold};
pub use sweep::{AcrossSweeps, EachSweep, Measurement};

/// A pure function of one sweep producing a scalar or an omission signal.
pub trait SweepMeasure: Send + Sync {
    /// Sweep attributes the measure reads; sweeps lacking one are rejected.
    fn attributes(&self) -> &'static [SweepAttribute] {
        &[SweepAttribute::SampleRate, SweepAttribute::Signal]
    }
    fn measure(&self, sweep: &SweepView<'_>) -> MeasureResult<f64>;
}

impl<F> SweepMeasure for F
where
    F: Fn(&SweepView<'_>) -> MeasureResult<f64> + Send + Sync,
{
    fn measure(&self, sweep: &SweepView<'_>) -> MeasureResult<f64> {
        self(sweep)
    }
}

/// Which way a deflection counts as a peak.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// Crests are peaks.
    #[default]
    Positive,
    /// Troughs are peaks.
    Negative,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Positive => 1.0,
            Direction::Negative => -1.0,
        }
    }
}

impl TryFrom<i32> for Direction {
    type Error = ConfigError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Direction::Positive),
            -1 => Ok(Direction::Negative),
            other => Err(ConfigError::InvalidDirection(other)),
        }
    }
}
