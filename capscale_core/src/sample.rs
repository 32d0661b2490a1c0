//! Calibration samples and the append-only store that owns them.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::feature::FeatureMode;
use crate::model::ModelTag;

pub type SampleId = u64;

/// One measurement event. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationSample {
    pub id: SampleId,
    pub timestamp: DateTime<Utc>,
    pub real_weight_g: f64,
    pub measured_weight_g: f64,
    pub predicted_weight_g: f64,
    pub adc_raw: i32,
    pub delta_counts: i64,
    #[serde(rename = "feature_key")]
    pub feature: FeatureMode,
    pub feature_value: f64,
    pub reference_capacity_pf: f64,
    pub predicted_capacity_pf: f64,
    pub tare_at_measurement: i32,
    pub calibration_at_measurement: f64,
    pub calibration_offset_at_measurement: f64,
    pub model_tag: ModelTag,
}

impl CalibrationSample {
    pub fn training_point(&self) -> TrainingPoint {
        TrainingPoint {
            feature: self.feature_value,
            target: self.reference_capacity_pf,
        }
    }
}

/// `(feature, target capacitance)` pair consumed by the fitters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingPoint {
    pub feature: f64,
    pub target: f64,
}

impl TrainingPoint {
    pub fn new(feature: f64, target: f64) -> Self {
        Self { feature, target }
    }
}

/// Ordered sample collection with ids starting at 1.
#[derive(Debug, Clone)]
pub struct SampleStore {
    samples: Vec<CalibrationSample>,
    next_id: SampleId,
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            next_id: 1,
        }
    }

    /// Id the next appended sample receives.
    pub fn next_id(&self) -> SampleId {
        self.next_id
    }

    /// Append a sample, overwriting its `id` with the next id.
    pub fn append(&mut self, mut sample: CalibrationSample) -> SampleId {
        let id = self.next_id;
        sample.id = id;
        self.samples.push(sample);
        self.next_id += 1;
        id
    }

    pub fn as_slice(&self) -> &[CalibrationSample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CalibrationSample> {
        self.samples.iter()
    }

    pub fn get(&self, id: SampleId) -> Option<&CalibrationSample> {
        self.samples.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drop every sample and restart ids at 1.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.next_id = 1;
    }
}

#[cfg(test)]
pub(crate) fn sample_at(real_weight_g: f64, feature_value: f64, target: f64) -> CalibrationSample {
    CalibrationSample {
        id: 0,
        timestamp: DateTime::<Utc>::UNIX_EPOCH,
        real_weight_g,
        measured_weight_g: 0.0,
        predicted_weight_g: 0.0,
        adc_raw: 0,
        delta_counts: 0,
        feature: FeatureMode::Delta,
        feature_value,
        reference_capacity_pf: target,
        predicted_capacity_pf: 0.0,
        tare_at_measurement: 0,
        calibration_at_measurement: 0.0,
        calibration_offset_at_measurement: 0.0,
        model_tag: ModelTag::default(),
    }
}
