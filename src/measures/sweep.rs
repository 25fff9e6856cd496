// src/measures/sweep.rs
use crate::error::{MeasureError, MeasureResult};
use crate::measures::SweepMeasure;
use crate::recording::{Recording, SweepView};

/// A measurement over a whole recording, producing one raw value per
/// contributing sweep (or whatever list the measurement defines).
pub trait Measurement: Send + Sync {
    fn run(&self, recording: &Recording) -> MeasureResult<Vec<f64>>;
}

/// Runs a [`SweepMeasure`] once per sweep, in index order.
///
/// Sweeps that signal no-result are left out of the list; any other error
/// stops the run and is returned for the whole recording.
#[derive(Clone, Debug)]
pub struct EachSweep<M> {
    measure: M,
}

impl<M: SweepMeasure> EachSweep<M> {
    pub fn new(measure: M) -> Self {
        Self { measure }
    }

    pub fn inner(&self) -> &M {
        &self.measure
    }
}

impl<M: SweepMeasure> Measurement for EachSweep<M> {
    fn run(&self, recording: &Recording) -> MeasureResult<Vec<f64>> {
        let mut results = Vec::with_capacity(recording.sweep_count());
        for sweep in recording.sweeps() {
            if let Some(missing) = self
                .measure
                .attributes()
                .iter()
                .find(|attribute| !sweep.provides(**attribute))
            {
                return Err(MeasureError::invalid(format!(
                    "sweep {} has no {missing:?} data",
                    sweep.index
                )));
            }
            match self.measure.measure(&sweep) {
                Ok(value) => results.push(value),
                Err(MeasureError::NoResult(reason)) => {
                    log::trace!("sweep {} omitted: {reason}", sweep.index);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(results)
    }
}

/// Hands every sweep of a recording to one function at once.
pub struct AcrossSweeps<F> {
    func: F,
}

impl<F> AcrossSweeps<F>
where
    F: Fn(&[SweepView<'_>]) -> MeasureResult<Vec<f64>> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Measurement for AcrossSweeps<F>
where
    F: Fn(&[SweepView<'_>]) -> MeasureResult<Vec<f64>> + Send + Sync,
{
    fn run(&self, recording: &Recording) -> MeasureResult<Vec<f64>> {
        let sweeps: Vec<SweepView<'_>> = recording.sweeps().collect();
        (self.func)(&sweeps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{ChannelUnits, SweepAttribute, SweepData};

    fn recording(sweeps: usize) -> Recording {
        let data = (0..sweeps)
            .map(|i| SweepData::from_signal(1_000, vec![i as f64; 3], vec![]))
            .collect();
        Recording::new("rec", 1_000, ChannelUnits::default(), data).unwrap()
    }

    #[test]
    fn each_sweep_collects_in_order() {
        let measure = EachSweep::new(|sweep: &SweepView<'_>| -> MeasureResult<f64> {
            Ok(sweep.y[0] * 10.0)
        });
        assert_eq!(measure.run(&recording(4)).unwrap(), vec![0.0, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn no_result_sweep_is_omitted() {
        let measure = EachSweep::new(|sweep: &SweepView<'_>| -> MeasureResult<f64> {
            if sweep.index == 2 {
                Err(MeasureError::no_result("skip"))
            } else {
                Ok(sweep.index as f64)
            }
        });
        assert_eq!(measure.run(&recording(5)).unwrap(), vec![0.0, 1.0, 3.0, 4.0]);
    }

    #[test]
    fn invalid_recording_aborts_the_run() {
        let measure = EachSweep::new(|sweep: &SweepView<'_>| -> MeasureResult<f64> {
            if sweep.index == 1 {
                Err(MeasureError::invalid("wrong clamp mode"))
            } else {
                Ok(1.0)
            }
        });
        assert_eq!(
            measure.run(&recording(3)),
            Err(MeasureError::InvalidRecording("wrong clamp mode".into()))
        );
    }

    struct NeedsCommand;

    impl SweepMeasure for NeedsCommand {
        fn attributes(&self) -> &'static [SweepAttribute] {
            &[SweepAttribute::Signal, SweepAttribute::Command]
        }
        fn measure(&self, _sweep: &SweepView<'_>) -> MeasureResult<f64> {
            Ok(0.0)
        }
    }

    #[test]
    fn missing_declared_attribute_is_invalid() {
        let result = EachSweep::new(NeedsCommand).run(&recording(2));
        assert!(matches!(result, Err(MeasureError::InvalidRecording(_))));
    }

    #[test]
    fn across_sweeps_sees_every_sweep() {
        let measure = AcrossSweeps::new(|sweeps: &[SweepView<'_>]| {
            Ok(vec![sweeps.iter().map(|s| s.y[0]).sum()])
        });
        assert_eq!(measure.run(&recording(4)).unwrap(), vec![6.0]);
    }
}
