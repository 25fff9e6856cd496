// src/config.rs
//! JSON description of a batch: recordings, analyses and derived measures.
//!
//! ```json
//! { "recordings": [ { "id": "cell1", "filepath": "cell1.json" } ],
//!   "analyses": [
//!     { "type": "custom", "name": "PP", "measures": [
//!         { "name": "First Peak", "kind": "peak_magnitude",
//!           "region": { "regions": [[200, 210]], "unit": "ms" },
//!           "baseline": { "regions": [[0, 200]] },
//!           "direction": -1, "bin_size": 0 } ] },
//!     { "type": "current_ramp" } ],
//!   "derived": [ { "group": "Ratios", "measures": [
//!     { "name": "PPR", "inputs": [["PP", "Second Peak"], ["PP", "First Peak"]],
//!       "function": "ratio" } ] } ] }
//! ```
use std::fs;
use std::num::NonZeroU32;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::binning::Reducer;
use crate::analysis::derived::{BuiltinRowFunction, DerivedMeasures, DEFAULT_GROUP};
use crate::analysis::presets::{self, PairedPulseSpans};
use crate::analysis::runner::{Analysis, AnalysisReport, MeasureOptions, RecordingBatch};
use crate::analysis::table::{NumericType, ResultsTable};
use crate::error::{ConfigError, SpanError};
use crate::measures::{
    AreaUnderCurve, Direction, EventCount, FirstThreeRatio, InputResistance, PeakMagnitude, Ramp,
    Rheobase, SpikeCount, SpikeThreshold,
};
use crate::recording::RecordingSource;
use crate::span::Span;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKeyword {
    Null,
    Full,
}

/// A span as written in a config file: `"null"`, `"full"` or explicit regions.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SpanConfig {
    Keyword(SpanKeyword),
    Regions {
        regions: Vec<(i64, i64)>,
        #[serde(default = "default_unit")]
        unit: String,
        /// Required for units outside the built-in vocabulary.
        #[serde(default)]
        factor: Option<i64>,
    },
}

fn default_unit() -> String {
    "ms".into()
}

impl Default for SpanConfig {
    fn default() -> Self {
        SpanConfig::Keyword(SpanKeyword::Null)
    }
}

impl SpanConfig {
    pub fn full() -> Self {
        SpanConfig::Keyword(SpanKeyword::Full)
    }

    pub fn build(&self) -> Result<Span, SpanError> {
        match self {
            SpanConfig::Keyword(SpanKeyword::Null) => Ok(Span::Null),
            SpanConfig::Keyword(SpanKeyword::Full) => Ok(Span::Full),
            SpanConfig::Regions {
                regions,
                unit,
                factor: Some(factor),
            } => Span::with_factor(regions.clone(), unit, *factor),
            SpanConfig::Regions { regions, unit, .. } => Span::new(regions.clone(), unit),
        }
    }
}

fn positive() -> i32 {
    1
}

fn negative() -> i32 {
    -1
}

fn one() -> u32 {
    1
}

fn spike_detection_mv() -> f64 {
    crate::measures::ramp::SPIKE_DETECTION_MV
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RampConfig {
    #[serde(default = "SpanConfig::full")]
    pub region: SpanConfig,
    #[serde(default = "spike_detection_mv")]
    pub spike_detection_mv: f64,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            region: SpanConfig::full(),
            spike_detection_mv: spike_detection_mv(),
        }
    }
}

impl RampConfig {
    fn build(&self) -> Result<Ramp, ConfigError> {
        Ok(Ramp {
            region: self.region.build()?,
            spike_detection_mv: self.spike_detection_mv,
        })
    }
}

/// Per-sweep measure and its parameters, tagged by `kind`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeasureKind {
    PeakMagnitude {
        #[serde(default = "SpanConfig::full")]
        region: SpanConfig,
        #[serde(default)]
        baseline: SpanConfig,
        #[serde(default = "positive")]
        direction: i32,
    },
    AreaUnderCurve {
        #[serde(default = "SpanConfig::full")]
        region: SpanConfig,
        #[serde(default)]
        baseline: SpanConfig,
        #[serde(default = "negative")]
        direction: i32,
    },
    SpikeCount {
        #[serde(default = "SpanConfig::full")]
        region: SpanConfig,
        #[serde(default)]
        threshold: Option<f64>,
        #[serde(default = "one")]
        stims_per_sweep: u32,
    },
    EventCount {
        #[serde(default = "SpanConfig::full")]
        region: SpanConfig,
        #[serde(default)]
        baseline: SpanConfig,
        #[serde(default = "positive")]
        direction: i32,
        #[serde(default)]
        height: Option<f64>,
    },
    SpikeThreshold(RampConfig),
    Rheobase(RampConfig),
    InputResistance(RampConfig),
    FirstThreeRatio(RampConfig),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MeasureConfig {
    pub name: String,
    #[serde(flatten)]
    pub kind: MeasureKind,
    /// Absent keeps every sweep's value, `0` reduces them all, `n` bins by `n`.
    #[serde(default)]
    pub bin_size: Option<usize>,
    #[serde(default)]
    pub reducer: ReducerName,
    #[serde(default)]
    pub dtype: NumericType,
}

/// Built-in reducers by name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReducerName {
    #[default]
    Mean,
    Median,
    Sum,
    Min,
    Max,
    First,
    Last,
}

impl From<ReducerName> for Reducer {
    fn from(name: ReducerName) -> Self {
        match name {
            ReducerName::Mean => Reducer::Mean,
            ReducerName::Median => Reducer::Median,
            ReducerName::Sum => Reducer::Sum,
            ReducerName::Min => Reducer::Min,
            ReducerName::Max => Reducer::Max,
            ReducerName::First => Reducer::First,
            ReducerName::Last => Reducer::Last,
        }
    }
}

impl MeasureConfig {
    fn options(&self) -> MeasureOptions {
        MeasureOptions::binned(self.bin_size)
            .with_reducer(self.reducer.into())
            .with_dtype(self.dtype)
    }

    pub fn register(&self, analysis: &mut Analysis) -> Result<(), ConfigError> {
        let name = self.name.clone();
        let options = self.options();
        match &self.kind {
            MeasureKind::PeakMagnitude {
                region,
                baseline,
                direction,
            } => analysis.add_sweep_measure(
                name,
                PeakMagnitude::new(region.build()?, baseline.build()?, Direction::try_from(*direction)?),
                options,
            )?,
            MeasureKind::AreaUnderCurve {
                region,
                baseline,
                direction,
            } => analysis.add_sweep_measure(
                name,
                AreaUnderCurve::new(region.build()?, baseline.build()?, Direction::try_from(*direction)?),
                options,
            )?,
            MeasureKind::SpikeCount {
                region,
                threshold,
                stims_per_sweep,
            } => {
                let stims = NonZeroU32::new(*stims_per_sweep).ok_or(ConfigError::InvalidStimCount)?;
                analysis.add_sweep_measure(
                    name,
                    SpikeCount::new(region.build()?, *threshold, stims),
                    options,
                )?
            }
            MeasureKind::EventCount {
                region,
                baseline,
                direction,
                height,
            } => analysis.add_sweep_measure(
                name,
                EventCount {
                    region: region.build()?,
                    baseline: baseline.build()?,
                    direction: Direction::try_from(*direction)?,
                    height: *height,
                },
                options,
            )?,
            MeasureKind::SpikeThreshold(ramp) => {
                analysis.add_sweep_measure(name, SpikeThreshold { ramp: ramp.build()? }, options)?
            }
            MeasureKind::Rheobase(ramp) => {
                analysis.add_sweep_measure(name, Rheobase { ramp: ramp.build()? }, options)?
            }
            MeasureKind::InputResistance(ramp) => {
                analysis.add_sweep_measure(name, InputResistance { ramp: ramp.build()? }, options)?
            }
            MeasureKind::FirstThreeRatio(ramp) => {
                analysis.add_sweep_measure(name, FirstThreeRatio { ramp: ramp.build()? }, options)?
            }
        }
        Ok(())
    }
}

fn one_bin() -> Option<usize> {
    Some(1)
}

/// An analysis: either a named list of measures or one of the presets.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisConfig {
    Custom {
        name: String,
        measures: Vec<MeasureConfig>,
    },
    StimEvents {
        #[serde(default = "one")]
        stims_per_trace: u32,
        #[serde(default)]
        baseline: SpanConfig,
    },
    CurrentRamp,
    PairedPulseWithSealTest {
        baseline: SpanConfig,
        first_peak: SpanConfig,
        second_peak: SpanConfig,
        seal_test_baseline: SpanConfig,
        seal_test_peak: SpanConfig,
        #[serde(default = "one_bin")]
        bin_size: Option<usize>,
    },
}

impl AnalysisConfig {
    pub fn build(&self) -> Result<Analysis, ConfigError> {
        let analysis = match self {
            AnalysisConfig::Custom { name, measures } => {
                let mut analysis = Analysis::new(name.clone());
                for measure in measures {
                    measure.register(&mut analysis)?;
                }
                analysis
            }
            AnalysisConfig::StimEvents {
                stims_per_trace,
                baseline,
            } => {
                let stims = NonZeroU32::new(*stims_per_trace).ok_or(ConfigError::InvalidStimCount)?;
                presets::stim_events(stims, baseline.build()?)?
            }
            AnalysisConfig::CurrentRamp => presets::current_ramp()?,
            AnalysisConfig::PairedPulseWithSealTest {
                baseline,
                first_peak,
                second_peak,
                seal_test_baseline,
                seal_test_peak,
                bin_size,
            } => {
                let spans = PairedPulseSpans {
                    baseline: baseline.build()?,
                    first_peak: first_peak.build()?,
                    second_peak: second_peak.build()?,
                    seal_test_baseline: seal_test_baseline.build()?,
                    seal_test_peak: seal_test_peak.build()?,
                };
                presets::paired_pulse_with_seal_test(spans, *bin_size)?
            }
        };
        Ok(analysis)
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DerivedMeasureConfig {
    pub name: String,
    /// `(group, column)` pairs handed to the function in order.
    pub inputs: Vec<(String, String)>,
    pub function: BuiltinRowFunction,
    #[serde(default)]
    pub dtype: NumericType,
}

fn default_group() -> String {
    DEFAULT_GROUP.into()
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DerivedConfig {
    #[serde(default = "default_group")]
    pub group: String,
    pub measures: Vec<DerivedMeasureConfig>,
}

impl DerivedConfig {
    pub fn build(&self) -> Result<DerivedMeasures, ConfigError> {
        let mut derived = DerivedMeasures::new(self.group.clone());
        for measure in &self.measures {
            derived.add_row_function(
                measure.inputs.iter().cloned(),
                measure.function.function(),
                measure.name.clone(),
                measure.dtype,
            )?;
        }
        Ok(derived)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PincerConfig {
    pub recordings: RecordingBatch,
    pub analyses: Vec<AnalysisConfig>,
    pub derived: Vec<DerivedConfig>,
}

/// Everything a batch run produces.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchOutput {
    pub report: AnalysisReport,
    pub derived: Vec<ResultsTable>,
}

impl PincerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build every analysis and derived set up front; any configuration error
    /// stops the run before a recording is opened.
    pub fn run<S>(&self, source: &S) -> Result<BatchOutput, ConfigError>
    where
        S: RecordingSource + ?Sized,
    {
        let analyses = self
            .analyses
            .iter()
            .map(AnalysisConfig::build)
            .collect::<Result<Vec<_>, _>>()?;
        let derived = self
            .derived
            .iter()
            .map(DerivedConfig::build)
            .collect::<Result<Vec<_>, _>>()?;

        let mut output = BatchOutput::default();
        for analysis in &analyses {
            log::info!(
                "running {} over {} recordings",
                analysis.name(),
                self.recordings.len()
            );
            output.report.merge(analysis.process(source, &self.recordings));
        }
        output.derived = derived
            .iter()
            .map(|set| set.process(&output.report.table))
            .collect();
        Ok(output)
    }
}
