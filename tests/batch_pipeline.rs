// tests/batch_pipeline.rs
use std::fs;
use std::path::{Path, PathBuf};

use pincer::analysis::{
    Analysis, BuiltinRowFunction, CellValue, ColumnKey, DerivedMeasures, MeasureOptions,
    NumericType, RecordingBatch,
};
use pincer::measures::{Direction, PeakMagnitude};
use pincer::recording::JsonFileSource;
use pincer::{AnalysisError, PincerConfig, Span};

const RATE_HZ: u32 = 10_000;

/// Ten sweeps at -60 mV baseline, each with one inward deflection of
/// `10 * (i + 1)` inside the 200-210 ms window.
fn write_paired_pulse(dir: &Path, name: &str) -> PathBuf {
    let sweeps: Vec<_> = (0..10)
        .map(|i| {
            let mut y = vec![-60.0; 3_000];
            y[2_050] = -60.0 - 10.0 * (i + 1) as f64;
            serde_json::json!({ "y": y })
        })
        .collect();
    let doc = serde_json::json!({
        "sample_rate_hz": RATE_HZ,
        "units": { "x": "sec", "y": "pA", "c": "mV" },
        "sweeps": sweeps,
    });
    let path = dir.join(name);
    fs::write(&path, doc.to_string()).unwrap();
    path
}

fn ms(start: i64, end: i64) -> Span {
    Span::new((start, end), "ms").unwrap()
}

fn peak() -> PeakMagnitude {
    PeakMagnitude::new(ms(200, 210), ms(0, 200), Direction::Negative)
}

#[test]
fn two_recording_batch_with_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_paired_pulse(dir.path(), "a.json");
    let missing = dir.path().join("nope.json");

    let mut analysis = Analysis::new("PP");
    analysis
        .add_sweep_measure("Peak", peak(), MeasureOptions::default())
        .unwrap();
    analysis
        .add_sweep_measure("Mean Peak", peak(), MeasureOptions::binned(Some(0)))
        .unwrap();
    analysis
        .add_sweep_measure("Binned Peak", peak(), MeasureOptions::binned(Some(4)))
        .unwrap();

    let mut batch = RecordingBatch::new();
    batch.push("A", &good).push("B", &missing);
    let report = analysis.process(&JsonFileSource, &batch);

    let expected: Vec<f64> = (1..=10).map(|i| 10.0 * i as f64).collect();
    let cell = |name: &str| report.table.get("A", &ColumnKey::new("PP", name));
    assert_eq!(cell("Peak"), Some(&CellValue::Series(expected)));
    assert_eq!(cell("Mean Peak"), Some(&CellValue::Scalar(55.0)));
    assert_eq!(cell("Binned Peak"), Some(&CellValue::Series(vec![25.0, 65.0])));

    assert!(report.table.row("B").is_none());
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains(&missing.display().to_string()));
    assert!(report.errors[0].contains("does not exist or cannot be loaded"));
}

#[test]
fn duplicate_names_are_rejected_everywhere() {
    let mut analysis = Analysis::new("PP");
    analysis
        .add_sweep_measure("Peak", peak(), MeasureOptions::default())
        .unwrap();
    assert_eq!(
        analysis.add_sweep_measure("Peak", peak(), MeasureOptions::binned(Some(0))),
        Err(AnalysisError::DuplicateMeasure { name: "Peak".into() })
    );
    assert_eq!(analysis.measure_names().count(), 1);

    let mut derived = DerivedMeasures::default();
    let inputs = [("PP", "Peak"), ("PP", "Peak")];
    derived
        .add_row_function(inputs, BuiltinRowFunction::Ratio.function(), "r", NumericType::Float64)
        .unwrap();
    assert!(derived
        .add_row_function(inputs, BuiltinRowFunction::Sum.function(), "r", NumericType::Float64)
        .is_err());
}

#[test]
fn config_driven_run_with_derived_ratio() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_paired_pulse(dir.path(), "a.json");
    let config = serde_json::json!({
        "recordings": [
            { "id": "A", "filepath": good },
            { "id": "B", "filepath": dir.path().join("gone.json") }
        ],
        "analyses": [{
            "type": "custom", "name": "PP",
            "measures": [
                { "name": "Early", "kind": "peak_magnitude", "direction": -1, "bin_size": 0,
                  "reducer": "first",
                  "region": { "regions": [[200, 210]] }, "baseline": { "regions": [[0, 200]] } },
                { "name": "Late", "kind": "peak_magnitude", "direction": -1, "bin_size": 0,
                  "reducer": "last",
                  "region": { "regions": [[200, 210]] }, "baseline": { "regions": [[0, 200]] } }
            ]
        }],
        "derived": [{ "group": "Ratios", "measures": [
            { "name": "Late/Early", "inputs": [["PP", "Late"], ["PP", "Early"]], "function": "ratio" }
        ]}]
    });
    let config_path = dir.path().join("config.json");
    fs::write(&config_path, config.to_string()).unwrap();

    let output = PincerConfig::load(&config_path)
        .unwrap()
        .run(&JsonFileSource)
        .unwrap();
    assert_eq!(output.report.errors.len(), 1);
    let ratios = &output.derived[0];
    assert_eq!(
        ratios.get("A", &ColumnKey::new("Ratios", "Late/Early")),
        Some(&CellValue::Scalar(10.0))
    );
    assert!(ratios.row("B").is_none());

    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["report"]["table"]["rows"][0]["PP/Early"], 10.0);
}

#[test]
fn union_of_mixed_units() {
    let seconds = Span::new((0, 1), "s").unwrap();
    let millis = Span::new(vec![(500, 1_500), (3_000, 4_000)], "ms").unwrap();
    let merged = seconds.union(&millis).unwrap();
    assert_eq!(merged, Span::new(vec![(0, 1_500), (3_000, 4_000)], "ms").unwrap());
    assert_eq!(Span::Null.union(&millis).unwrap(), millis);
    assert_eq!(Span::Full.union(&millis).unwrap(), Span::Full);
}
