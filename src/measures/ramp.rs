// src/measures/ramp.rs
//! Current-ramp protocol measures.
//!
//! The ramp is the part of a sweep where the injected current changes. The
//! first action potential on the ramp marks the spike; its threshold is
//! taken at the peak curvature of the voltage rise leading up to it.
use ndarray::{Array1, ArrayView1};

use crate::error::{MeasureError, MeasureResult};
use crate::measures::signal::{argmax, find_peaks, gradient, mean};
use crate::measures::SweepMeasure;
use crate::recording::{SweepAttribute, SweepView};
use crate::span::Span;

/// Voltage a local maximum must exceed to count as an action potential.
pub const SPIKE_DETECTION_MV: f64 = -20.0;

/// Index offset introduced by differentiating the rise twice.
const INFLECTION_SHIFT: usize = 2;

const RAMP_ATTRIBUTES: &[SweepAttribute] = &[
    SweepAttribute::SampleRate,
    SweepAttribute::Signal,
    SweepAttribute::Command,
];

/// Settings shared by every ramp measure.
#[derive(Clone, Debug, PartialEq)]
pub struct Ramp {
    /// Portion of the sweep searched for the ramp.
    pub region: Span,
    pub spike_detection_mv: f64,
}

impl Default for Ramp {
    fn default() -> Self {
        Self {
            region: Span::Full,
            spike_detection_mv: SPIKE_DETECTION_MV,
        }
    }
}

impl Ramp {
    pub fn new(region: Span) -> Self {
        Self {
            region,
            ..Self::default()
        }
    }

    fn analyse(&self, sweep: &SweepView<'_>) -> MeasureResult<RampTrace> {
        if sweep.is_voltage_clamp() {
            return Err(MeasureError::invalid(format!(
                "ramp measures need a current clamp recording, signal is in {}",
                sweep.units_y
            )));
        }
        let region = self.region.to_samples(sweep.sample_rate_hz)?;
        let signal = region.crop(sweep.y)?;
        let command = region.crop(sweep.c)?;
        let slope = gradient(command.view());
        let (signal, command): (Vec<f64>, Vec<f64>) = slope
            .iter()
            .zip(signal.iter().zip(command.iter()))
            .filter(|(d, _)| **d != 0.0)
            .map(|(_, (&v, &i))| (v, i))
            .unzip();
        let signal = Array1::from(signal);
        let peaks = find_peaks(signal.view(), Some(self.spike_detection_mv));
        Ok(RampTrace {
            signal,
            command: Array1::from(command),
            peaks,
        })
    }
}

/// Signal and command restricted to the ramp, with detected spikes.
struct RampTrace {
    signal: Array1<f64>,
    command: Array1<f64>,
    peaks: Vec<usize>,
}

impl RampTrace {
    fn first_spike(&self) -> MeasureResult<usize> {
        self.peaks
            .first()
            .copied()
            .ok_or_else(|| MeasureError::no_result("no action potentials on the ramp"))
    }

    /// Index of the spike threshold within the ramp.
    fn inflection(&self, first_spike: usize) -> MeasureResult<usize> {
        let rise = self.rise(first_spike);
        let curvature = gradient(gradient(rise).view());
        let peak = argmax(curvature.view())
            .ok_or_else(|| MeasureError::no_result("no rise before the first action potential"))?;
        peak.checked_sub(INFLECTION_SHIFT)
            .ok_or_else(|| MeasureError::no_result("inflection precedes the start of the ramp"))
    }

    fn rise(&self, end: usize) -> ArrayView1<'_, f64> {
        self.signal.slice(ndarray::s![..end])
    }
}

/// Membrane voltage at the first action potential's threshold.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpikeThreshold {
    pub ramp: Ramp,
}

impl SweepMeasure for SpikeThreshold {
    fn attributes(&self) -> &'static [SweepAttribute] {
        RAMP_ATTRIBUTES
    }

    fn measure(&self, sweep: &SweepView<'_>) -> MeasureResult<f64> {
        let ramp = self.ramp.analyse(sweep)?;
        let index = ramp.inflection(ramp.first_spike()?)?;
        Ok(ramp.signal[index])
    }
}

/// Injected current at the first action potential's threshold.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rheobase {
    pub ramp: Ramp,
}

impl SweepMeasure for Rheobase {
    fn attributes(&self) -> &'static [SweepAttribute] {
        RAMP_ATTRIBUTES
    }

    fn measure(&self, sweep: &SweepView<'_>) -> MeasureResult<f64> {
        let ramp = self.ramp.analyse(sweep)?;
        let index = ramp.inflection(ramp.first_spike()?)?;
        Ok(ramp.command[index])
    }
}

/// Mean voltage slope of the passive part of the ramp.
///
/// Without a spike the whole ramp is passive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputResistance {
    pub ramp: Ramp,
}

impl SweepMeasure for InputResistance {
    fn attributes(&self) -> &'static [SweepAttribute] {
        RAMP_ATTRIBUTES
    }

    fn measure(&self, sweep: &SweepView<'_>) -> MeasureResult<f64> {
        let ramp = self.ramp.analyse(sweep)?;
        let passive = match ramp.peaks.first() {
            Some(&first) => ramp.rise(ramp.inflection(first)?),
            None => ramp.signal.view(),
        };
        mean(gradient(passive).view())
            .ok_or_else(|| MeasureError::no_result("no passive ramp samples"))
    }
}

/// Ratio of the first to the second inter-spike interval.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FirstThreeRatio {
    pub ramp: Ramp,
}

impl SweepMeasure for FirstThreeRatio {
    fn attributes(&self) -> &'static [SweepAttribute] {
        RAMP_ATTRIBUTES
    }

    fn measure(&self, sweep: &SweepView<'_>) -> MeasureResult<f64> {
        let ramp = self.ramp.analyse(sweep)?;
        match ramp.peaks[..] {
            [p0, p1, p2, ..] => Ok((p1 - p0) as f64 / (p2 - p1) as f64),
            _ => Err(MeasureError::no_result(format!(
                "{} action potentials, need three",
                ramp.peaks.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{ChannelUnits, Recording, SweepData};

    fn recording(units: ChannelUnits, y: Vec<f64>, c: Vec<f64>) -> Recording {
        Recording::new(
            "ramp",
            1_000,
            units,
            vec![SweepData::from_signal(1_000, y, c)],
        )
        .unwrap()
    }

    fn ramp_command(len: usize) -> Vec<f64> {
        (0..len).map(|i| 10.0 * i as f64).collect()
    }

    // Inflection lands on index 3 (-68 mV, 30 pA); spike peaks at index 7.
    fn single_spike() -> Recording {
        let y = vec![-70.0, -70.0, -69.0, -68.0, -67.0, -60.0, -40.0, 20.0, -60.0];
        let c = ramp_command(y.len());
        recording(ChannelUnits::default(), y, c)
    }

    #[test]
    fn threshold_and_rheobase_at_inflection() {
        let rec = single_spike();
        let sweep = rec.sweep(0).unwrap();
        assert_eq!(SpikeThreshold::default().measure(&sweep).unwrap(), -68.0);
        assert_eq!(Rheobase::default().measure(&sweep).unwrap(), 30.0);
    }

    #[test]
    fn input_resistance_uses_passive_rise() {
        let rec = single_spike();
        let sweep = rec.sweep(0).unwrap();
        assert_eq!(InputResistance::default().measure(&sweep).unwrap(), 0.5);

        let quiet = recording(
            ChannelUnits::default(),
            vec![-70.0, -68.0, -66.0, -64.0],
            ramp_command(4),
        );
        let sweep = quiet.sweep(0).unwrap();
        assert_eq!(InputResistance::default().measure(&sweep).unwrap(), 2.0);
        assert!(matches!(
            SpikeThreshold::default().measure(&sweep),
            Err(MeasureError::NoResult(_))
        ));
    }

    #[test]
    fn first_three_ratio_needs_three_spikes() {
        let mut y = vec![-70.0; 14];
        for &i in &[2, 5, 11] {
            y[i] = 10.0;
        }
        let rec = recording(ChannelUnits::default(), y, ramp_command(14));
        let sweep = rec.sweep(0).unwrap();
        assert_eq!(FirstThreeRatio::default().measure(&sweep).unwrap(), 0.5);

        let rec = single_spike();
        assert!(matches!(
            FirstThreeRatio::default().measure(&rec.sweep(0).unwrap()),
            Err(MeasureError::NoResult(_))
        ));
    }

    #[test]
    fn spikes_off_the_ramp_are_ignored() {
        let y = vec![-70.0, 10.0, -70.0, -70.0, -70.0, -69.0, -68.0];
        let c = vec![0.0, 0.0, 0.0, 0.0, 10.0, 20.0, 30.0];
        let rec = recording(ChannelUnits::default(), y, c);
        let sweep = rec.sweep(0).unwrap();
        assert!(matches!(
            Rheobase::default().measure(&sweep),
            Err(MeasureError::NoResult(_))
        ));
    }

    #[test]
    fn voltage_clamp_recording_is_invalid() {
        let rec = recording(ChannelUnits::voltage_clamp(), vec![0.0; 5], ramp_command(5));
        assert!(matches!(
            SpikeThreshold::default().measure(&rec.sweep(0).unwrap()),
            Err(MeasureError::InvalidRecording(_))
        ));
    }
}
