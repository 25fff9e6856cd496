// src/analysis/presets.rs
//! Ready-made analyses for the standard stimulation protocols.
use std::num::NonZeroU32;

use crate::analysis::binning::Reducer;
use crate::analysis::runner::{Analysis, MeasureOptions};
use crate::error::AnalysisError;
use crate::measures::ramp::SPIKE_DETECTION_MV;
use crate::measures::{
    AreaUnderCurve, Direction, FirstThreeRatio, InputResistance, PeakMagnitude, Rheobase,
    SpikeCount, SpikeThreshold,
};
use crate::span::Span;

pub const STIM_EVENTS: &str = "Stim_Events";
pub const CURRENT_RAMP: &str = "CurrentRamp";
pub const PAIRED_PULSE: &str = "PairedPulse_withSealTest";

/// Area under the curve and action potentials per light pulse, each averaged over sweeps.
pub fn stim_events(stims_per_trace: NonZeroU32, baseline: Span) -> Result<Analysis, AnalysisError> {
    let whole_mean = || MeasureOptions::binned(Some(0)).with_reducer(Reducer::Mean);
    let mut analysis = Analysis::new(STIM_EVENTS);
    analysis.add_sweep_measure(
        "AUC",
        AreaUnderCurve::new(Span::Full, baseline, Direction::Positive),
        whole_mean(),
    )?;
    analysis.add_sweep_measure(
        "APs/LP",
        SpikeCount::new(Span::Full, Some(SPIKE_DETECTION_MV), stims_per_trace),
        whole_mean(),
    )?;
    Ok(analysis)
}

/// Spike threshold, firing adaptation, input resistance and rheobase per sweep.
pub fn current_ramp() -> Result<Analysis, AnalysisError> {
    let mut analysis = Analysis::new(CURRENT_RAMP);
    analysis.add_sweep_measure("AP Threshold", SpikeThreshold::default(), MeasureOptions::default())?;
    analysis.add_sweep_measure("First3 Ratio", FirstThreeRatio::default(), MeasureOptions::default())?;
    analysis.add_sweep_measure(
        "Input Resistance",
        InputResistance::default(),
        MeasureOptions::default(),
    )?;
    analysis.add_sweep_measure("Rheobase", Rheobase::default(), MeasureOptions::default())?;
    Ok(analysis)
}

/// Windows of a paired-pulse sweep followed by a seal test.
#[derive(Clone, Debug, PartialEq)]
pub struct PairedPulseSpans {
    pub baseline: Span,
    pub first_peak: Span,
    pub second_peak: Span,
    pub seal_test_baseline: Span,
    pub seal_test_peak: Span,
}

/// Inward peak currents of both pulses and of the seal test's capacitive transient.
pub fn paired_pulse_with_seal_test(
    spans: PairedPulseSpans,
    bin_size: Option<usize>,
) -> Result<Analysis, AnalysisError> {
    let PairedPulseSpans {
        baseline,
        first_peak,
        second_peak,
        seal_test_baseline,
        seal_test_peak,
    } = spans;
    let inward = Direction::Negative;
    let mut analysis = Analysis::new(PAIRED_PULSE);
    analysis.add_sweep_measure(
        "First Peak Magnitude",
        PeakMagnitude::new(first_peak, baseline.clone(), inward),
        MeasureOptions::binned(bin_size),
    )?;
    analysis.add_sweep_measure(
        "Second Peak Magnitude",
        PeakMagnitude::new(second_peak, baseline, inward),
        MeasureOptions::binned(bin_size),
    )?;
    analysis.add_sweep_measure(
        "Capacitive Current Peak",
        PeakMagnitude::new(seal_test_peak, seal_test_baseline, inward),
        MeasureOptions::binned(bin_size),
    )?;
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::runner::RecordingBatch;
    use crate::analysis::table::{CellValue, ColumnKey};
    use crate::recording::{ChannelUnits, InMemorySource, Recording, SweepData};

    fn ms(start: i64, end: i64) -> Span {
        Span::new((start, end), "ms").unwrap()
    }

    #[test]
    fn preset_columns() {
        let stim = stim_events(NonZeroU32::new(3).unwrap(), Span::Null).unwrap();
        assert_eq!(stim.measure_names().collect::<Vec<_>>(), vec!["AUC", "APs/LP"]);
        let ramp = current_ramp().unwrap();
        assert_eq!(
            ramp.measure_names().collect::<Vec<_>>(),
            vec!["AP Threshold", "First3 Ratio", "Input Resistance", "Rheobase"]
        );
        assert_eq!(ramp.name(), CURRENT_RAMP);
    }

    #[test]
    fn paired_pulse_measures_inward_peaks() {
        // 1 kHz: baseline 0..4 ms at 0 pA, pulses at 5 and 8 ms, seal test at 11 ms.
        let y = vec![0.0, 0.0, 0.0, 0.0, 0.0, -50.0, 0.0, 0.0, -80.0, 0.0, 5.0, -200.0, 5.0];
        let sweeps = (0..4)
            .map(|_| SweepData::from_signal(1_000, y.clone(), vec![]))
            .collect();
        let rec = Recording::new("pp.json", 1_000, ChannelUnits::voltage_clamp(), sweeps).unwrap();
        let spans = PairedPulseSpans {
            baseline: ms(0, 4),
            first_peak: ms(4, 7),
            second_peak: ms(7, 10),
            seal_test_baseline: ms(10, 11),
            seal_test_peak: ms(11, 13),
        };
        let analysis = paired_pulse_with_seal_test(spans, Some(2)).unwrap();
        let batch: RecordingBatch = [("pp", "pp.json")].into_iter().collect();
        let report = analysis.process(&InMemorySource::new([rec]), &batch);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        let cell = |name: &str| report.table.get("pp", &ColumnKey::new(PAIRED_PULSE, name)).cloned();
        assert_eq!(cell("First Peak Magnitude"), Some(CellValue::Series(vec![50.0, 50.0])));
        assert_eq!(cell("Second Peak Magnitude"), Some(CellValue::Series(vec![80.0, 80.0])));
        assert_eq!(cell("Capacitive Current Peak"), Some(CellValue::Series(vec![205.0, 205.0])));
    }

    #[test]
    fn stim_events_averages_over_sweeps() {
        let sweeps = vec![
            SweepData::from_signal(1_000, vec![-70.0, 10.0, -70.0, 10.0, -70.0], vec![]),
            SweepData::from_signal(1_000, vec![-70.0, 10.0, -70.0, -70.0, -70.0], vec![]),
        ];
        let rec = Recording::new("stim.json", 1_000, ChannelUnits::default(), sweeps).unwrap();
        let analysis = stim_events(NonZeroU32::new(2).unwrap(), Span::Null).unwrap();
        let batch: RecordingBatch = [("s", "stim.json")].into_iter().collect();
        let report = analysis.process(&InMemorySource::new([rec]), &batch);
        let aps = report.table.get("s", &ColumnKey::new(STIM_EVENTS, "APs/LP"));
        assert_eq!(aps, Some(&CellValue::Scalar(0.75)));
        let auc = report.table.get("s", &ColumnKey::new(STIM_EVENTS, "AUC"));
        assert!(matches!(auc, Some(CellValue::Scalar(_))));
    }
}
