// src/recording/source.rs
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array1;
use serde::Deserialize;

use crate::error::RecordingError;
use crate::recording::{time_axis, ChannelUnits, Recording, SweepData};

/// Trait representing something that can open recordings by path.
pub trait RecordingSource {
    fn open(&self, path: &Path) -> Result<Recording, RecordingError>;
}

/// In-memory source useful for tests and deterministic playback.
#[derive(Default)]
pub struct InMemorySource {
    recordings: HashMap<PathBuf, Recording>,
}

impl InMemorySource {
    pub fn new(recordings: impl IntoIterator<Item = Recording>) -> Self {
        Self {
            recordings: recordings
                .into_iter()
                .map(|rec| (rec.path().to_path_buf(), rec))
                .collect(),
        }
    }

    pub fn insert(&mut self, recording: Recording) {
        self.recordings
            .insert(recording.path().to_path_buf(), recording);
    }
}

impl RecordingSource for InMemorySource {
    fn open(&self, path: &Path) -> Result<Recording, RecordingError> {
        self.recordings
            .get(path)
            .cloned()
            .ok_or_else(|| RecordingError::NotFound(path.to_path_buf()))
    }
}

/// Reads recordings stored as JSON documents.
///
/// ```json
/// { "sample_rate_hz": 20000,
///   "units": { "x": "sec", "y": "mV", "c": "pA" },
///   "sweeps": [ { "y": [..], "c": [..] } ] }
/// ```
///
/// `x` may be omitted per sweep; it is rebuilt from the sample rate.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFileSource;

#[derive(Deserialize)]
struct RecordingFile {
    sample_rate_hz: u32,
    #[serde(default)]
    units: ChannelUnits,
    sweeps: Vec<SweepFile>,
}

#[derive(Deserialize)]
struct SweepFile {
    #[serde(default)]
    x: Vec<f64>,
    y: Vec<f64>,
    #[serde(default)]
    c: Vec<f64>,
}

impl RecordingSource for JsonFileSource {
    fn open(&self, path: &Path) -> Result<Recording, RecordingError> {
        if !path.exists() {
            return Err(RecordingError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| RecordingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: RecordingFile =
            serde_json::from_str(&text).map_err(|source| RecordingError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let rate = file.sample_rate_hz;
        let sweeps = file
            .sweeps
            .into_iter()
            .map(|sweep| {
                let x = if sweep.x.is_empty() {
                    time_axis(rate, sweep.y.len())
                } else {
                    Array1::from(sweep.x)
                };
                SweepData::new(x, Array1::from(sweep.y), Array1::from(sweep.c))
            })
            .collect();
        let recording = Recording::new(path, rate, file.units, sweeps)?;
        log::debug!(
            "opened {} ({} sweeps at {} Hz)",
            path.display(),
            recording.sweep_count(),
            rate
        );
        Ok(recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn in_memory_source_opens_by_path() {
        let rec = Recording::new(
            "mem/a",
            1_000,
            ChannelUnits::default(),
            vec![SweepData::from_signal(1_000, vec![1.0, 2.0], vec![])],
        )
        .unwrap();
        let source = InMemorySource::new(vec![rec]);
        assert_eq!(source.open(Path::new("mem/a")).unwrap().sweep_count(), 1);
        assert!(matches!(
            source.open(Path::new("mem/b")),
            Err(RecordingError::NotFound(_))
        ));
    }

    #[test]
    fn json_source_reads_sweeps_and_builds_time_axis() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sample_rate_hz": 1000,
                "units": {{"x": "sec", "y": "mV", "c": "pA"}},
                "sweeps": [{{"y": [1.0, 2.0, 3.0], "c": [0.0, 5.0, 10.0]}},
                           {{"y": [4.0, 5.0, 6.0]}}]}}"#
        )
        .unwrap();
        let rec = JsonFileSource.open(file.path()).unwrap();
        assert_eq!(rec.sweep_count(), 2);
        let second = rec.sweep(1).unwrap();
        assert_eq!(second.y.to_vec(), vec![4.0, 5.0, 6.0]);
        assert!((second.x[2] - 0.002).abs() < 1e-12);
        assert!(second.c.is_empty());
        assert_eq!(rec.units().y, "mV");
    }

    #[test]
    fn json_source_error_kinds() {
        let missing = JsonFileSource.open(Path::new("/definitely/not/here.json"));
        assert!(matches!(missing, Err(RecordingError::NotFound(_))));

        let mut garbage = tempfile::NamedTempFile::new().unwrap();
        write!(garbage, "not json").unwrap();
        assert!(matches!(
            JsonFileSource.open(garbage.path()),
            Err(RecordingError::Parse { .. })
        ));

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        write!(empty, r#"{{"sample_rate_hz": 1000, "sweeps": []}}"#).unwrap();
        assert!(matches!(
            JsonFileSource.open(empty.path()),
            Err(RecordingError::Malformed { .. })
        ));
    }
}
