// src/span/unit.rs
use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::error::SpanError;

/// Micro-units per second; one sample lasts `MICROS_PER_SECOND / rate` of these.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Time unit of a span. Every unit is a whole number of microseconds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Micros,
    Millis,
    Seconds,
    Minutes,
    /// One sample at a given rate; `factor` is microseconds per sample.
    Samples { factor: i64 },
    /// Unit outside the vocabulary, only reachable with an explicit factor.
    Custom { name: String, factor: i64 },
}

/// Vocabulary units ordered from finest to coarsest.
const VOCABULARY: [TimeUnit; 4] = [
    TimeUnit::Micros,
    TimeUnit::Millis,
    TimeUnit::Seconds,
    TimeUnit::Minutes,
];

static UNIT_NAMES: Lazy<HashMap<&'static str, TimeUnit>> = Lazy::new(|| {
    HashMap::from([
        ("us", TimeUnit::Micros),
        ("ms", TimeUnit::Millis),
        ("s", TimeUnit::Seconds),
        ("sec", TimeUnit::Seconds),
        ("min", TimeUnit::Minutes),
    ])
});

impl TimeUnit {
    /// Resolve a vocabulary unit name.
    pub fn from_name(name: &str) -> Result<Self, SpanError> {
        UNIT_NAMES
            .get(name)
            .cloned()
            .ok_or_else(|| SpanError::UnknownUnit(name.to_owned()))
    }

    /// Resolve a unit name, falling back to a custom unit when a factor is given.
    ///
    /// Vocabulary names always use their fixed factor and ignore `factor`.
    pub fn parse(name: &str, factor: Option<i64>) -> Result<Self, SpanError> {
        if let Ok(unit) = Self::from_name(name) {
            return Ok(unit);
        }
        let factor = factor.ok_or_else(|| SpanError::MissingFactor(name.to_owned()))?;
        if factor <= 0 {
            return Err(SpanError::InvalidFactor(factor));
        }
        if name == "samples" {
            Ok(TimeUnit::Samples { factor })
        } else {
            Ok(TimeUnit::Custom {
                name: name.to_owned(),
                factor,
            })
        }
    }

    /// Sample unit for a recording rate.
    pub fn samples(sample_rate_hz: u32) -> Result<Self, SpanError> {
        let rate = i64::from(sample_rate_hz);
        if rate == 0 || rate > MICROS_PER_SECOND {
            return Err(SpanError::InvalidSampleRate(sample_rate_hz));
        }
        Ok(TimeUnit::Samples {
            factor: MICROS_PER_SECOND / rate,
        })
    }

    pub fn factor(&self) -> i64 {
        match self {
            TimeUnit::Micros => 1,
            TimeUnit::Millis => 1_000,
            TimeUnit::Seconds => MICROS_PER_SECOND,
            TimeUnit::Minutes => 60 * MICROS_PER_SECOND,
            TimeUnit::Samples { factor } | TimeUnit::Custom { factor, .. } => *factor,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TimeUnit::Micros => "us",
            TimeUnit::Millis => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "min",
            TimeUnit::Samples { .. } => "samples",
            TimeUnit::Custom { name, .. } => name,
        }
    }

    pub fn is_vocabulary(&self) -> bool {
        VOCABULARY.contains(self)
    }

    pub fn is_samples(&self) -> bool {
        matches!(self, TimeUnit::Samples { .. })
    }

    /// Comma separated list of the names accepted by [`TimeUnit::from_name`].
    pub fn valid_units() -> String {
        let mut names: Vec<_> = UNIT_NAMES.iter().collect();
        names.sort_by_key(|(name, unit)| (unit.factor(), **name));
        names
            .into_iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Coarsest vocabulary unit both units convert to without fractional loss.
    pub fn common(left: &TimeUnit, right: &TimeUnit) -> Result<TimeUnit, SpanError> {
        if left == right {
            return Ok(left.clone());
        }
        if !(left.is_vocabulary() && right.is_vocabulary()) {
            return Err(SpanError::IncompatibleUnits {
                left: left.to_string(),
                right: right.to_string(),
            });
        }
        let (lf, rf) = (left.factor(), right.factor());
        let finest = lf.min(rf);
        VOCABULARY
            .iter()
            .rev()
            .find(|unit| {
                let f = unit.factor();
                f <= finest && lf % f == 0 && rf % f == 0
            })
            .cloned()
            .ok_or_else(|| SpanError::IncompatibleUnits {
                left: left.to_string(),
                right: right.to_string(),
            })
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Samples { factor } => write!(f, "samples ({factor} us each)"),
            TimeUnit::Custom { name, factor } => write!(f, "{name} ({factor} us each)"),
            unit => f.write_str(unit.name()),
        }
    }
}
