//! Engine configuration, already clamped into usable ranges.

use serde::Serialize;

use crate::feature::FeatureMode;
use crate::model::{ModelFamily, ModelTag};
use crate::reference::ReferenceModel;
use crate::select::{Criterion, SampleScope};

/// Everything a retrain depends on.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FitSettings {
    pub family: ModelFamily,
    pub criterion: Criterion,
    pub scope: SampleScope,
    pub inverse: bool,
    pub feature: FeatureMode,
    /// 0 disables outlier trimming.
    pub outlier_sigma: f64,
    pub ridge_lambda: f64,
    /// Input at which `CalibrationModel::factor` is evaluated.
    pub reference_delta_counts: f64,
}

impl FitSettings {
    pub fn tag(&self) -> ModelTag {
        ModelTag::new(self.family, self.inverse, self.feature)
    }

    /// Floor sigma and lambda at 0 (NaN becomes 0) and zero a non-finite
    /// reference input.
    pub fn sanitized(mut self) -> Self {
        self.outlier_sigma = non_negative(self.outlier_sigma);
        self.ridge_lambda = non_negative(self.ridge_lambda);
        if !self.reference_delta_counts.is_finite() {
            self.reference_delta_counts = 0.0;
        }
        self
    }
}

#[inline]
fn non_negative(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.max(0.0) }
}

/// Averaging applied to raw readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AcquisitionCfg {
    pub average_count: u32,
    pub tare_average_count: u32,
}

impl Default for AcquisitionCfg {
    fn default() -> Self {
        Self {
            average_count: 16,
            tare_average_count: 16,
        }
    }
}

/// Round a requested averaging count and floor it at 1. NaN maps to the default of 16.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn average_count_from(requested: f64) -> u32 {
    if requested.is_nan() {
        return AcquisitionCfg::default().average_count;
    }
    requested.round().clamp(1.0, f64::from(u32::MAX)) as u32
}

/// Linear fallback `weight = delta * factor + offset` used while no model is applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FallbackCalibration {
    pub factor: f64,
    pub offset: f64,
}

impl Default for FallbackCalibration {
    fn default() -> Self {
        Self {
            factor: 0.0005,
            offset: 0.0,
        }
    }
}

impl FallbackCalibration {
    #[inline]
    pub fn weight_g(&self, delta_counts: f64) -> f64 {
        delta_counts * self.factor + self.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EngineConfig {
    pub fit: FitSettings,
    pub acquisition: AcquisitionCfg,
    pub reference: ReferenceModel,
    pub fallback: FallbackCalibration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_count_rounds_and_floors() {
        assert_eq!(average_count_from(0.0), 1);
        assert_eq!(average_count_from(-5.0), 1);
        assert_eq!(average_count_from(2.5), 3);
        assert_eq!(average_count_from(7.4), 7);
        assert_eq!(average_count_from(f64::NAN), 16);
    }

    #[test]
    fn sanitize_floors_at_zero() {
        let s = FitSettings {
            outlier_sigma: -1.0,
            ridge_lambda: f64::NAN,
            reference_delta_counts: f64::INFINITY,
            ..FitSettings::default()
        }
        .sanitized();
        assert_eq!(s.outlier_sigma, 0.0);
        assert_eq!(s.ridge_lambda, 0.0);
        assert_eq!(s.reference_delta_counts, 0.0);
    }
}
