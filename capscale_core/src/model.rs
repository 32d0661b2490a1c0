//! Model families, fitted curves and the `CalibrationModel` value produced by a retrain.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::feature::FeatureMode;
use crate::reference::EPSILON;

/// The three supported parametric families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    #[default]
    Linear,
    Quadratic,
    Exponential,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::Linear,
        ModelFamily::Quadratic,
        ModelFamily::Exponential,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::Linear => "linear",
            ModelFamily::Quadratic => "quadratic",
            ModelFamily::Exponential => "exponential",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModelFamily::Linear => "Linear",
            ModelFamily::Quadratic => "Quadratic",
            ModelFamily::Exponential => "Exponential",
        }
    }

    /// Number of fitted coefficients.
    pub fn param_count(self) -> usize {
        match self {
            ModelFamily::Linear => 1,
            ModelFamily::Quadratic | ModelFamily::Exponential => 2,
        }
    }

    /// Fewest training points a fit of this family accepts.
    pub fn min_samples(self) -> usize {
        match self {
            ModelFamily::Linear => 1,
            ModelFamily::Quadratic => 2,
            ModelFamily::Exponential => 3,
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelFamily::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseError::new("model family", s))
    }
}

/// Input transform applied before fitting and prediction.
///
/// With `inverse` set this is `sign(x) / (|x| + EPSILON)` where `sign(0) = +1`.
/// It is not self-inverse.
#[inline]
pub fn transform(x: f64, inverse: bool) -> f64 {
    if !inverse {
        return x;
    }
    let sign = if x >= 0.0 { 1.0 } else { -1.0 };
    sign / (x.abs() + EPSILON)
}

/// A fitted curve in transformed-input space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    /// `slope * u`
    Linear { slope: f64 },
    /// `a * u^2 + b * u`
    Quadratic { a: f64, b: f64 },
    /// `scale * exp(rate * u)`
    Exponential { scale: f64, rate: f64 },
}

impl Curve {
    pub fn family(&self) -> ModelFamily {
        match self {
            Curve::Linear { .. } => ModelFamily::Linear,
            Curve::Quadratic { .. } => ModelFamily::Quadratic,
            Curve::Exponential { .. } => ModelFamily::Exponential,
        }
    }

    pub fn coefficients(&self) -> Vec<f64> {
        match *self {
            Curve::Linear { slope } => vec![slope],
            Curve::Quadratic { a, b } => vec![a, b],
            Curve::Exponential { scale, rate } => vec![scale, rate],
        }
    }

    pub fn is_finite(&self) -> bool {
        match *self {
            Curve::Linear { slope } => slope.is_finite(),
            Curve::Quadratic { a, b } => a.is_finite() && b.is_finite(),
            Curve::Exponential { scale, rate } => scale.is_finite() && rate.is_finite(),
        }
    }

    /// Evaluate at an already transformed input.
    #[inline]
    pub fn eval(&self, u: f64) -> f64 {
        match *self {
            Curve::Linear { slope } => slope * u,
            Curve::Quadratic { a, b } => a * u * u + b * u,
            Curve::Exponential { scale, rate } => scale * (rate * u).exp(),
        }
    }

    #[inline]
    pub fn predict(&self, x: f64, inverse: bool) -> f64 {
        self.eval(transform(x, inverse))
    }

    /// Closed-form derivative with respect to the curve input.
    pub fn slope_at(&self, u: f64) -> f64 {
        match *self {
            Curve::Linear { slope } => slope,
            Curve::Quadratic { a, b } => 2.0 * a * u + b,
            Curve::Exponential { scale, rate } => scale * rate * (rate * u).exp(),
        }
    }

    /// Local sensitivity d(prediction)/dx at `x`.
    ///
    /// In inverse mode this is a centered difference through `transform` with
    /// step `max(1e-6, |x| * 1e-3)`.
    pub fn local_factor(&self, x: f64, inverse: bool) -> f64 {
        if inverse {
            let h = (x.abs() * 1e-3).max(1e-6);
            (self.predict(x + h, true) - self.predict(x - h, true)) / (2.0 * h)
        } else {
            self.slope_at(x)
        }
    }
}

/// Result of one successful retrain. Never mutated after construction.
///
/// Serializes flat: the curve becomes `key` plus `coefficients`, alongside the
/// label, feature mode and fit metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationModel {
    pub curve: Curve,
    pub inverse: bool,
    pub feature: FeatureMode,
    pub factor: f64,
    pub offset: f64,
    pub used_samples: usize,
    pub total_samples: usize,
    pub max_abs_error: f64,
    pub r2: f64,
    pub mae: f64,
    pub rmse: f64,
    pub reference_delta_counts: f64,
}

impl CalibrationModel {
    pub fn family(&self) -> ModelFamily {
        self.curve.family()
    }

    pub fn key(&self) -> &'static str {
        self.family().as_str()
    }

    pub fn coefficients(&self) -> Vec<f64> {
        self.curve.coefficients()
    }

    /// Predicted capacitance (pF) for a feature value.
    #[inline]
    pub fn predict(&self, feature_value: f64) -> f64 {
        self.curve.predict(feature_value, self.inverse)
    }

    pub fn label(&self) -> String {
        let mut s = self.family().display_name().to_string();
        if self.inverse {
            s.push_str(" + Inverse");
        }
        s
    }

    pub fn tag(&self) -> ModelTag {
        ModelTag {
            family: self.family(),
            inverse: self.inverse,
            feature: self.feature,
        }
    }
}

impl Serialize for CalibrationModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("CalibrationModel", 14)?;
        s.serialize_field("key", self.key())?;
        s.serialize_field("label", &self.label())?;
        s.serialize_field("inverse", &self.inverse)?;
        s.serialize_field("feature", &self.feature)?;
        s.serialize_field("coefficients", &self.coefficients())?;
        s.serialize_field("factor", &self.factor)?;
        s.serialize_field("offset", &self.offset)?;
        s.serialize_field("reference_delta_counts", &self.reference_delta_counts)?;
        s.serialize_field("used_samples", &self.used_samples)?;
        s.serialize_field("total_samples", &self.total_samples)?;
        s.serialize_field("mae", &self.mae)?;
        s.serialize_field("rmse", &self.rmse)?;
        s.serialize_field("max_abs_error", &self.max_abs_error)?;
        s.serialize_field("r2", &self.r2)?;
        s.end()
    }
}

/// Identifies the configuration a sample was captured under:
/// `<family>|inv=<0|1>|feat=<feature>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModelTag {
    pub family: ModelFamily,
    pub inverse: bool,
    pub feature: FeatureMode,
}

impl ModelTag {
    pub fn new(family: ModelFamily, inverse: bool, feature: FeatureMode) -> Self {
        Self {
            family,
            inverse,
            feature,
        }
    }

    /// Human label, e.g. `Quadratic + Inverse [abs_delta]`.
    pub fn label(&self) -> String {
        format!(
            "{}{} [{}]",
            self.family.display_name(),
            if self.inverse { " + Inverse" } else { "" },
            self.feature
        )
    }
}

impl fmt::Display for ModelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|inv={}|feat={}",
            self.family,
            u8::from(self.inverse),
            self.feature
        )
    }
}

impl FromStr for ModelTag {
    type Err = ParseError;

    /// Accepts the full form and a bare family name (older tags), which maps to
    /// a non-inverse `delta` tag. Missing `inv=`/`feat=` parts take the same defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('|');
        let family = parts.next().unwrap_or_default().parse::<ModelFamily>()?;
        let mut tag = ModelTag::new(family, false, FeatureMode::Delta);
        for part in parts {
            if let Some(v) = part.strip_prefix("inv=") {
                tag.inverse = match v {
                    "0" => false,
                    "1" => true,
                    _ => return Err(ParseError::new("model tag", s)),
                };
            } else if let Some(v) = part.strip_prefix("feat=") {
                tag.feature = v.parse()?;
            } else {
                return Err(ParseError::new("model tag", s));
            }
        }
        Ok(tag)
    }
}

impl Serialize for ModelTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
