//! Live prediction through the applied model or the linear fallback.

use crate::config::FallbackCalibration;
use crate::model::CalibrationModel;
use crate::reference::ReferenceModel;

/// A live estimate for one raw reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub capacity_pf: f64,
    pub weight_g: f64,
}

/// Converts raw readings into capacitance and weight. Never fails.
#[derive(Debug, Clone, Copy)]
pub struct RuntimePredictor<'a> {
    pub model: Option<&'a CalibrationModel>,
    pub fallback: FallbackCalibration,
    pub reference: ReferenceModel,
}

impl RuntimePredictor<'_> {
    /// With an applied model the feature is extracted per the model's recorded
    /// mode and the predicted capacitance is inverted to weight. Without one,
    /// `weight = delta * factor + offset` and the capacitance is `C(weight)`.
    pub fn estimate(&self, adc_raw: i32, delta_counts: i64) -> Estimate {
        let raw = f64::from(adc_raw);
        let delta = delta_counts as f64;
        match self.model {
            Some(m) => {
                let capacity_pf = m.predict(m.feature.extract(raw, delta));
                Estimate {
                    capacity_pf,
                    weight_g: self.reference.weight_from_capacity(capacity_pf),
                }
            }
            None => {
                let weight_g = self.fallback.weight_g(delta);
                Estimate {
                    capacity_pf: self.reference.capacity_from_weight(weight_g),
                    weight_g,
                }
            }
        }
    }

    pub fn capacity_pf(&self, adc_raw: i32, delta_counts: i64) -> f64 {
        self.estimate(adc_raw, delta_counts).capacity_pf
    }

    pub fn weight_g(&self, adc_raw: i32, delta_counts: i64) -> f64 {
        self.estimate(adc_raw, delta_counts).weight_g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureMode;
    use crate::model::Curve;

    #[test]
    fn fallback_is_linear_in_delta() {
        let p = RuntimePredictor {
            model: None,
            fallback: FallbackCalibration {
                factor: 0.5,
                offset: 1.0,
            },
            reference: ReferenceModel::default(),
        };
        let e = p.estimate(1200, 200);
        assert_eq!(e.weight_g, 101.0);
        assert_eq!(e.capacity_pf, ReferenceModel::default().capacity_from_weight(101.0));
    }

    #[test]
    fn applied_model_uses_its_feature_mode() {
        let model = CalibrationModel {
            curve: Curve::Linear { slope: 0.01 },
            inverse: false,
            feature: FeatureMode::AdcRaw,
            factor: 0.01,
            offset: 0.0,
            used_samples: 2,
            total_samples: 2,
            max_abs_error: 0.0,
            r2: 1.0,
            mae: 0.0,
            rmse: 0.0,
            reference_delta_counts: 0.0,
        };
        let reference = ReferenceModel::default();
        let p = RuntimePredictor {
            model: Some(&model),
            fallback: FallbackCalibration::default(),
            reference,
        };
        let e = p.estimate(2000, 500);
        assert!((e.capacity_pf - 20.0).abs() < 1e-12);
        assert_eq!(e.weight_g, reference.weight_from_capacity(20.0));
    }
}
