//! Signal feature extraction: the scalar the models are fitted against.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// How a raw reading and its tare delta become the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureMode {
    /// `adc_raw - tare`
    #[default]
    Delta,
    /// `|delta|`
    AbsDelta,
    /// The averaged reading itself.
    AdcRaw,
    /// `ln(|delta| + 1)`, defined everywhere since the argument is >= 1.
    LogAbsDelta,
}

impl FeatureMode {
    pub const ALL: [FeatureMode; 4] = [
        FeatureMode::Delta,
        FeatureMode::AbsDelta,
        FeatureMode::AdcRaw,
        FeatureMode::LogAbsDelta,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureMode::Delta => "delta",
            FeatureMode::AbsDelta => "abs_delta",
            FeatureMode::AdcRaw => "adc_raw",
            FeatureMode::LogAbsDelta => "log_abs_delta",
        }
    }

    #[inline]
    pub fn extract(self, adc_raw: f64, delta: f64) -> f64 {
        match self {
            FeatureMode::Delta => delta,
            FeatureMode::AbsDelta => delta.abs(),
            FeatureMode::AdcRaw => adc_raw,
            FeatureMode::LogAbsDelta => (delta.abs() + 1.0).ln(),
        }
    }
}

impl fmt::Display for FeatureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureMode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseError::new("feature", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_each_mode() {
        assert_eq!(FeatureMode::Delta.extract(1200.0, -200.0), -200.0);
        assert_eq!(FeatureMode::AbsDelta.extract(1200.0, -200.0), 200.0);
        assert_eq!(FeatureMode::AdcRaw.extract(1200.0, -200.0), 1200.0);
        assert_eq!(FeatureMode::LogAbsDelta.extract(1200.0, 0.0), 0.0);
        assert!((FeatureMode::LogAbsDelta.extract(0.0, -(std::f64::consts::E - 1.0)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn parses_its_own_names() {
        for m in FeatureMode::ALL {
            assert_eq!(m.as_str().parse::<FeatureMode>().unwrap(), m);
        }
        assert!("raw".parse::<FeatureMode>().is_err());
    }
}
