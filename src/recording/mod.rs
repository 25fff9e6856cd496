// src/recording/mod.rs
pub mod source;

use std::path::{Path, PathBuf};

use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::RecordingError;
pub use source::{InMemorySource, JsonFileSource, RecordingSource};

/// Per-sweep attributes a measurement can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepAttribute {
    SampleRate,
    Time,
    Signal,
    Command,
}

/// Unit strings of the time axis, recorded signal and command signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelUnits {
    pub x: String,
    pub y: String,
    pub c: String,
}

impl Default for ChannelUnits {
    fn default() -> Self {
        // Current clamp: membrane voltage recorded, current injected.
        Self {
            x: "sec".into(),
            y: "mV".into(),
            c: "pA".into(),
        }
    }
}

impl ChannelUnits {
    pub fn voltage_clamp() -> Self {
        Self {
            x: "sec".into(),
            y: "pA".into(),
            c: "mV".into(),
        }
    }
}

/// Arrays of one sweep. `c` is empty when the recording has no command channel.
#[derive(Clone, Debug)]
pub struct SweepData {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub c: Array1<f64>,
}

impl SweepData {
    pub fn new(x: Array1<f64>, y: Array1<f64>, c: Array1<f64>) -> Self {
        Self { x, y, c }
    }

    /// Sweep with a time axis in seconds derived from the sample rate.
    pub fn from_signal(sample_rate_hz: u32, y: Vec<f64>, c: Vec<f64>) -> Self {
        let x = time_axis(sample_rate_hz, y.len());
        Self {
            x,
            y: Array1::from(y),
            c: Array1::from(c),
        }
    }
}

/// Time of each sample in seconds.
pub fn time_axis(sample_rate_hz: u32, len: usize) -> Array1<f64> {
    let dt = 1.0 / f64::from(sample_rate_hz.max(1));
    Array1::from_shape_fn(len, |i| i as f64 * dt)
}

/// An opened multi-sweep recording.
#[derive(Clone, Debug)]
pub struct Recording {
    path: PathBuf,
    sample_rate_hz: u32,
    units: ChannelUnits,
    sweeps: Vec<SweepData>,
}

impl Recording {
    pub fn new(
        path: impl Into<PathBuf>,
        sample_rate_hz: u32,
        units: ChannelUnits,
        sweeps: Vec<SweepData>,
    ) -> Result<Self, RecordingError> {
        let path = path.into();
        let malformed = |reason: String| RecordingError::Malformed {
            path: path.clone(),
            reason,
        };
        if sample_rate_hz == 0 {
            return Err(malformed("sample rate must be greater than zero".into()));
        }
        if sweeps.is_empty() {
            return Err(malformed("recording has no sweeps".into()));
        }
        for (index, sweep) in sweeps.iter().enumerate() {
            let len = sweep.y.len();
            if sweep.x.len() != len {
                return Err(malformed(format!(
                    "sweep {index}: time axis has {} samples, signal has {len}",
                    sweep.x.len()
                )));
            }
            if !sweep.c.is_empty() && sweep.c.len() != len {
                return Err(malformed(format!(
                    "sweep {index}: command has {} samples, signal has {len}",
                    sweep.c.len()
                )));
            }
        }
        Ok(Self {
            path,
            sample_rate_hz,
            units,
            sweeps,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn units(&self) -> &ChannelUnits {
        &self.units
    }

    pub fn sweep_count(&self) -> usize {
        self.sweeps.len()
    }

    pub fn sweep(&self, index: usize) -> Option<SweepView<'_>> {
        self.sweeps.get(index).map(|data| SweepView {
            index,
            sample_rate_hz: self.sample_rate_hz,
            x: data.x.view(),
            y: data.y.view(),
            c: data.c.view(),
            units_x: &self.units.x,
            units_y: &self.units.y,
            units_c: &self.units.c,
        })
    }

    /// Sweeps in index order.
    pub fn sweeps(&self) -> impl Iterator<Item = SweepView<'_>> + '_ {
        (0..self.sweep_count()).filter_map(move |index| self.sweep(index))
    }
}

/// Read-only view of the currently selected sweep.
#[derive(Clone, Copy, Debug)]
pub struct SweepView<'a> {
    pub index: usize,
    pub sample_rate_hz: u32,
    pub x: ArrayView1<'a, f64>,
    pub y: ArrayView1<'a, f64>,
    pub c: ArrayView1<'a, f64>,
    pub units_x: &'a str,
    pub units_y: &'a str,
    pub units_c: &'a str,
}

impl SweepView<'_> {
    pub fn provides(&self, attribute: SweepAttribute) -> bool {
        match attribute {
            SweepAttribute::SampleRate => self.sample_rate_hz > 0,
            SweepAttribute::Time => !self.x.is_empty(),
            SweepAttribute::Signal => !self.y.is_empty(),
            SweepAttribute::Command => !self.c.is_empty(),
        }
    }

    /// Whether the recorded signal is a current, i.e. the cell was voltage clamped.
    pub fn is_voltage_clamp(&self) -> bool {
        matches!(self.units_y, "pA" | "nA" | "uA" | "A")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep(len: usize) -> SweepData {
        SweepData::from_signal(10_000, vec![0.0; len], vec![])
    }

    #[test]
    fn recording_exposes_sweeps_in_order() {
        let rec = Recording::new(
            "a.json",
            10_000,
            ChannelUnits::default(),
            vec![sweep(4), sweep(4), sweep(4)],
        )
        .unwrap();
        assert_eq!(rec.sweep_count(), 3);
        let indices: Vec<_> = rec.sweeps().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        let first = rec.sweep(0).unwrap();
        assert_eq!(first.sample_rate_hz, 10_000);
        assert!((first.x[1] - 1.0e-4).abs() < 1e-12);
        assert!(!first.provides(SweepAttribute::Command));
        assert!(first.provides(SweepAttribute::Signal));
        assert!(!first.is_voltage_clamp());
        assert!(rec.sweep(3).is_none());
    }

    #[test]
    fn recording_validation() {
        let zero_rate = Recording::new("a", 0, ChannelUnits::default(), vec![sweep(2)]);
        assert!(matches!(zero_rate, Err(RecordingError::Malformed { .. })));
        let no_sweeps = Recording::new("a", 100, ChannelUnits::default(), vec![]);
        assert!(matches!(no_sweeps, Err(RecordingError::Malformed { .. })));
        let bad_command = SweepData::from_signal(100, vec![0.0; 3], vec![1.0; 2]);
        let mismatch = Recording::new("a", 100, ChannelUnits::default(), vec![bad_command]);
        assert!(matches!(mismatch, Err(RecordingError::Malformed { .. })));
    }

    #[test]
    fn voltage_clamp_units() {
        let rec = Recording::new(
            "vc",
            10_000,
            ChannelUnits::voltage_clamp(),
            vec![sweep(2)],
        )
        .unwrap();
        assert!(rec.sweep(0).unwrap().is_voltage_clamp());
    }
}
