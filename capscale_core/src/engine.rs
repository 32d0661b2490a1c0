//! `CalibrationEngine`: owns the sample store, the advisory and runtime-active
//! models, and the tare baseline, and exposes the operator commands.
//!
//! Every mutation happens through `&mut self`; retraining is delegated to the
//! pure `select::train`.

use std::sync::Arc;

use capscale_traits::{Clock, RawReadingSource, SystemClock};
use serde::Serialize;

use crate::config::{AcquisitionCfg, EngineConfig, FallbackCalibration, FitSettings};
use crate::error::{BuildError, EngineError, Result};
use crate::model::{CalibrationModel, ModelTag};
use crate::reference::ReferenceModel;
use crate::runtime::{Estimate, RuntimePredictor};
use crate::sample::{CalibrationSample, SampleId, SampleStore};
use crate::select;

/// One live reading pushed through the runtime predictor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LiveReading {
    pub adc_raw: i32,
    pub delta_counts: i64,
    pub capacity_pf: f64,
    pub weight_g: f64,
}

/// A stored sample with predictions recomputed against the advisory model.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SampleRow<'a> {
    #[serde(flatten)]
    pub sample: &'a CalibrationSample,
    pub active_capacity_pf: f64,
    pub active_weight_g: f64,
    pub capacity_error_pf: f64,
    pub weight_error_g: f64,
}

/// Two points of the advisory model spanning the stored feature range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitOverlay {
    pub from: (f64, f64),
    pub to: (f64, f64),
}

pub struct CalibrationEngine {
    config: EngineConfig,
    store: SampleStore,
    tare_counts: i32,
    advisory: Option<CalibrationModel>,
    runtime: Option<CalibrationModel>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for CalibrationEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CalibrationEngine")
            .field("samples", &self.store.len())
            .field("tare_counts", &self.tare_counts)
            .field("advisory", &self.advisory.as_ref().map(CalibrationModel::label))
            .field("runtime", &self.runtime.as_ref().map(CalibrationModel::label))
            .finish_non_exhaustive()
    }
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl CalibrationEngine {
    /// Engine with a system clock. Out-of-range fit settings are clamped.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_parts(config, Arc::new(SystemClock::new()), 0)
    }

    pub fn builder() -> CalibrationEngineBuilder {
        CalibrationEngineBuilder::default()
    }

    fn with_parts(mut config: EngineConfig, clock: Arc<dyn Clock + Send + Sync>, tare_counts: i32) -> Self {
        config.fit = config.fit.sanitized();
        Self {
            config,
            store: SampleStore::new(),
            tare_counts,
            advisory: None,
            runtime: None,
            clock,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the configuration and retrain the advisory model.
    pub fn update_config(&mut self, mut config: EngineConfig) {
        config.fit = config.fit.sanitized();
        self.config = config;
        self.retrain();
    }

    pub fn update_fit_settings(&mut self, fit: FitSettings) {
        self.update_config(EngineConfig { fit, ..self.config });
    }

    pub fn set_reference(&mut self, reference: ReferenceModel) {
        self.update_config(EngineConfig { reference, ..self.config });
    }

    pub fn set_acquisition(&mut self, acquisition: AcquisitionCfg) {
        self.config.acquisition = acquisition;
    }

    /// Replace the linear fallback. Discards the runtime-active model.
    pub fn set_fallback(&mut self, factor: f64, offset: f64) {
        self.config.fallback = FallbackCalibration { factor, offset };
        self.runtime = None;
        tracing::info!(factor, offset, "fallback calibration saved");
    }

    pub fn tare_counts(&self) -> i32 {
        self.tare_counts
    }

    pub fn set_tare_counts(&mut self, counts: i32) {
        self.tare_counts = counts;
    }

    /// `adc_raw - tare`, exact over the whole `i32` range.
    pub fn delta_counts(&self, adc_raw: i32) -> i64 {
        i64::from(adc_raw) - i64::from(self.tare_counts)
    }

    /// Capture the current averaged reading as the tare baseline.
    pub fn tare<R: RawReadingSource + ?Sized>(&mut self, source: &mut R) -> Result<i32> {
        let reading = source
            .averaged_reading(self.config.acquisition.tare_average_count)
            .map_err(|e| {
                tracing::warn!(error = %e, "tare reading failed");
                eyre::Report::new(EngineError::Source(e.to_string()))
            })?;
        self.tare_counts = reading.primary;
        tracing::info!(tare = reading.primary, "tare captured");
        Ok(reading.primary)
    }

    /// Take an averaged reading and store it as a sample for `real_weight_g`.
    ///
    /// An invalid weight is a no-op (`Ok(None)`) and no reading is taken.
    pub fn measure_and_add<R: RawReadingSource + ?Sized>(
        &mut self,
        source: &mut R,
        real_weight_g: f64,
    ) -> Result<Option<SampleId>> {
        if !is_valid_weight(real_weight_g) {
            tracing::debug!(real_weight_g, "ignoring invalid reference weight");
            return Ok(None);
        }
        let reading = source
            .averaged_reading(self.config.acquisition.average_count)
            .map_err(|e| {
                tracing::warn!(error = %e, "sample reading failed");
                eyre::Report::new(EngineError::Source(e.to_string()))
            })?;
        Ok(self.add_sample(real_weight_g, reading.primary))
    }

    /// Store a sample for an already acquired reading and retrain.
    ///
    /// Returns `None` without touching the store when `real_weight_g` is
    /// negative or not finite.
    pub fn add_sample(&mut self, real_weight_g: f64, adc_raw: i32) -> Option<SampleId> {
        if !is_valid_weight(real_weight_g) {
            tracing::debug!(real_weight_g, "ignoring invalid reference weight");
            return None;
        }

        let fit = self.config.fit;
        let reference = self.config.reference;
        let delta_counts = self.delta_counts(adc_raw);
        let predicted_capacity_pf = self.predictor().capacity_pf(adc_raw, delta_counts);
        let measured_weight_g = reference.weight_from_capacity(predicted_capacity_pf);

        let sample = CalibrationSample {
            id: self.store.next_id(),
            timestamp: self.clock.now(),
            real_weight_g,
            measured_weight_g,
            predicted_weight_g: measured_weight_g,
            adc_raw,
            delta_counts,
            feature: fit.feature,
            feature_value: fit.feature.extract(f64::from(adc_raw), delta_counts as f64),
            reference_capacity_pf: reference.capacity_from_weight(real_weight_g),
            predicted_capacity_pf,
            tare_at_measurement: self.tare_counts,
            calibration_at_measurement: self.config.fallback.factor,
            calibration_offset_at_measurement: self.config.fallback.offset,
            model_tag: fit.tag(),
        };
        let id = self.store.append(sample);
        tracing::debug!(id, real_weight_g, adc_raw, delta_counts, "sample added");

        self.retrain();
        Some(id)
    }

    /// Refit the advisory model from the stored samples.
    pub fn retrain(&mut self) -> Option<&CalibrationModel> {
        self.advisory = match select::train(self.store.as_slice(), &self.config.fit) {
            Ok(model) => {
                tracing::debug!(
                    model = %model.label(),
                    used = model.used_samples,
                    total = model.total_samples,
                    rmse = model.rmse,
                    r2 = model.r2,
                    "model retrained"
                );
                Some(model)
            }
            Err(e) => {
                tracing::debug!(reason = %e, "no model");
                None
            }
        };
        self.advisory.as_ref()
    }

    /// Copy the advisory model into the runtime slot. Returns `false` when
    /// there is nothing to apply.
    pub fn apply_recommended_model(&mut self) -> bool {
        match &self.advisory {
            Some(model) => {
                tracing::info!(model = %model.label(), "model applied");
                self.runtime = Some(model.clone());
                true
            }
            None => false,
        }
    }

    /// Clear samples, both model slots, and the id counter.
    pub fn reset_all_samples(&mut self) {
        self.store.clear();
        self.advisory = None;
        self.runtime = None;
        tracing::info!("samples reset");
    }

    pub fn samples(&self) -> &[CalibrationSample] {
        self.store.as_slice()
    }

    pub fn sample(&self, id: SampleId) -> Option<&CalibrationSample> {
        self.store.get(id)
    }

    pub fn advisory_model(&self) -> Option<&CalibrationModel> {
        self.advisory.as_ref()
    }

    pub fn runtime_model(&self) -> Option<&CalibrationModel> {
        self.runtime.as_ref()
    }

    pub fn predictor(&self) -> RuntimePredictor<'_> {
        RuntimePredictor {
            model: self.runtime.as_ref(),
            fallback: self.config.fallback,
            reference: self.config.reference,
        }
    }

    pub fn estimate(&self, adc_raw: i32) -> Estimate {
        self.predictor().estimate(adc_raw, self.delta_counts(adc_raw))
    }

    pub fn predict_weight(&self, adc_raw: i32) -> f64 {
        self.estimate(adc_raw).weight_g
    }

    pub fn live_reading(&self, adc_raw: i32) -> LiveReading {
        let delta_counts = self.delta_counts(adc_raw);
        let e = self.predictor().estimate(adc_raw, delta_counts);
        LiveReading {
            adc_raw,
            delta_counts,
            capacity_pf: e.capacity_pf,
            weight_g: e.weight_g,
        }
    }

    /// Stored samples with "active" predictions from the advisory model, or the
    /// capture-time prediction when there is no model.
    pub fn sample_rows(&self) -> Vec<SampleRow<'_>> {
        let reference = self.config.reference;
        self.store
            .iter()
            .map(|sample| {
                let active_capacity_pf = self
                    .advisory
                    .as_ref()
                    .map_or(sample.predicted_capacity_pf, |m| m.predict(sample.feature_value));
                let active_weight_g = reference.weight_from_capacity(active_capacity_pf);
                SampleRow {
                    sample,
                    active_capacity_pf,
                    active_weight_g,
                    capacity_error_pf: active_capacity_pf - sample.reference_capacity_pf,
                    weight_error_g: active_weight_g - sample.real_weight_g,
                }
            })
            .collect()
    }

    /// The advisory model at the smallest and largest stored feature value,
    /// widened by 1 on each side when they coincide.
    #[allow(clippy::float_cmp)]
    pub fn fit_overlay(&self) -> Option<FitOverlay> {
        let model = self.advisory.as_ref()?;
        let mut xs = self.store.iter().map(|s| s.feature_value);
        let first = xs.next()?;
        let (mut lo, mut hi) = xs.fold((first, first), |(lo, hi), x| (lo.min(x), hi.max(x)));
        if lo == hi {
            lo -= 1.0;
            hi += 1.0;
        }
        Some(FitOverlay {
            from: (lo, model.predict(lo)),
            to: (hi, model.predict(hi)),
        })
    }

    /// Samples grouped by the model tag they were captured under, groups in
    /// order of first appearance.
    pub fn samples_by_tag(&self) -> Vec<(ModelTag, Vec<&CalibrationSample>)> {
        let mut groups: Vec<(ModelTag, Vec<&CalibrationSample>)> = Vec::new();
        for sample in self.store.iter() {
            match groups.iter_mut().find(|(tag, _)| *tag == sample.model_tag) {
                Some((_, members)) => members.push(sample),
                None => groups.push((sample.model_tag, vec![sample])),
            }
        }
        groups
    }
}

#[inline]
fn is_valid_weight(w: f64) -> bool {
    w.is_finite() && w >= 0.0
}

// ── Builder ──────────────────────────────────────────────────────────────────

/// Builder for `CalibrationEngine`. Unlike `CalibrationEngine::new`, `try_build`
/// rejects out-of-range settings instead of clamping them.
#[derive(Default)]
pub struct CalibrationEngineBuilder {
    config: EngineConfig,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    tare_counts: i32,
}

impl CalibrationEngineBuilder {
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_fit_settings(mut self, fit: FitSettings) -> Self {
        self.config.fit = fit;
        self
    }

    pub fn with_reference(mut self, reference: ReferenceModel) -> Self {
        self.config.reference = reference;
        self
    }

    pub fn with_fallback(mut self, factor: f64, offset: f64) -> Self {
        self.config.fallback = FallbackCalibration { factor, offset };
        self
    }

    pub fn with_acquisition(mut self, acquisition: AcquisitionCfg) -> Self {
        self.config.acquisition = acquisition;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_tare_counts(mut self, counts: i32) -> Self {
        self.tare_counts = counts;
        self
    }

    pub fn try_build(self) -> Result<CalibrationEngine> {
        validate(&self.config)?;
        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(SystemClock::new()),
        };
        Ok(CalibrationEngine::with_parts(self.config, clock, self.tare_counts))
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(config: &EngineConfig) -> Result<()> {
    let fit = &config.fit;
    if fit.outlier_sigma.is_nan() || fit.outlier_sigma < 0.0 {
        return Err(invalid("outlier sigma must be >= 0"));
    }
    if fit.ridge_lambda.is_nan() || fit.ridge_lambda < 0.0 {
        return Err(invalid("ridge lambda must be >= 0"));
    }
    if !fit.reference_delta_counts.is_finite() {
        return Err(invalid("reference delta counts must be finite"));
    }
    if config.acquisition.average_count == 0 || config.acquisition.tare_average_count == 0 {
        return Err(invalid("averaging counts must be >= 1"));
    }
    let r = &config.reference;
    if !(r.a.is_finite() && r.b.is_finite() && r.c0.is_finite()) {
        return Err(invalid("reference constants must be finite"));
    }
    if !(config.fallback.factor.is_finite() && config.fallback.offset.is_finite()) {
        return Err(invalid("fallback factor and offset must be finite"));
    }
    Ok(())
}
