//! Candidate fitting and best-model selection.
//!
//! `train` is the whole retrain step as a pure function of the stored samples
//! and the current settings; the engine only decides when to call it.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::config::FitSettings;
use crate::error::{FitError, ParseError};
use crate::evaluate::evaluate;
use crate::fit::fit_curve;
use crate::model::{CalibrationModel, ModelFamily};
use crate::outlier::filter_outliers;
use crate::sample::{CalibrationSample, TrainingPoint};

/// Fewest training points before outlier trimming is attempted.
pub const MIN_POINTS_FOR_OUTLIER_FILTER: usize = 4;

/// Ranking used when more than one candidate fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    #[default]
    Rmse,
    Mae,
    MaxErr,
    R2,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [Criterion::Rmse, Criterion::Mae, Criterion::MaxErr, Criterion::R2];

    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::Rmse => "rmse",
            Criterion::Mae => "mae",
            Criterion::MaxErr => "maxerr",
            Criterion::R2 => "r2",
        }
    }

    /// Strictly better; ties keep the current model.
    pub fn is_better(self, candidate: &CalibrationModel, current: &CalibrationModel) -> bool {
        match self {
            Criterion::Rmse => candidate.rmse < current.rmse,
            Criterion::Mae => candidate.mae < current.mae,
            Criterion::MaxErr => candidate.max_abs_error < current.max_abs_error,
            Criterion::R2 => candidate.r2 > current.r2,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Criterion {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Criterion::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseError::new("criterion", s))
    }
}

/// Which stored samples a retrain sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleScope {
    #[default]
    All,
    /// Only samples captured under the currently configured model tag.
    ActiveModel,
}

impl SampleScope {
    pub fn as_str(self) -> &'static str {
        match self {
            SampleScope::All => "all",
            SampleScope::ActiveModel => "active_model",
        }
    }
}

impl fmt::Display for SampleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleScope {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(SampleScope::All),
            "active_model" => Ok(SampleScope::ActiveModel),
            _ => Err(ParseError::new("sample scope", s)),
        }
    }
}

/// Training points for the configured scope, in store order.
pub fn training_points(samples: &[CalibrationSample], settings: &FitSettings) -> Vec<TrainingPoint> {
    let tag = settings.tag();
    samples
        .iter()
        .filter(|s| settings.scope == SampleScope::All || s.model_tag == tag)
        .map(CalibrationSample::training_point)
        .collect()
}

/// Fit one family, optionally trimming outliers and refitting on the survivors.
///
/// Trimming runs only with `outlier_sigma > 0` and at least
/// `MIN_POINTS_FOR_OUTLIER_FILTER` points. A trimmed set smaller than the
/// family minimum is discarded. If the refit on the trimmed set fails, the
/// first fit is scored on the trimmed set instead. A model whose residuals
/// overflow is `FitError::NonFiniteLoss`.
pub fn fit_model(
    family: ModelFamily,
    points: &[TrainingPoint],
    total_samples: usize,
    settings: &FitSettings,
) -> Result<CalibrationModel, FitError> {
    let inverse = settings.inverse;
    let mut curve = fit_curve(family, points, inverse, settings.ridge_lambda)?;
    let mut used = points.to_vec();

    if settings.outlier_sigma > 0.0 && points.len() >= MIN_POINTS_FOR_OUTLIER_FILTER {
        let kept = filter_outliers(&curve, points, settings.outlier_sigma, inverse);
        if kept.len() >= family.min_samples() {
            match fit_curve(family, &kept, inverse, settings.ridge_lambda) {
                Ok(refit) => curve = refit,
                Err(e) => tracing::debug!(error = %e, "refit after outlier trim failed"),
            }
            used = kept;
        }
    }

    let metrics = evaluate(&curve, &used, inverse);
    if !metrics.rmse.is_finite() {
        return Err(FitError::NonFiniteLoss);
    }
    let x_ref = settings.reference_delta_counts;
    Ok(CalibrationModel {
        curve,
        inverse,
        feature: settings.feature,
        factor: curve.local_factor(x_ref, inverse),
        offset: curve.predict(0.0, inverse),
        used_samples: used.len(),
        total_samples,
        max_abs_error: metrics.max_abs_error,
        r2: metrics.r2,
        mae: metrics.mae,
        rmse: metrics.rmse,
        reference_delta_counts: x_ref,
    })
}

/// Fit every candidate family and keep the best under `settings.criterion`.
pub fn train_candidates(
    families: &[ModelFamily],
    points: &[TrainingPoint],
    total_samples: usize,
    settings: &FitSettings,
) -> Result<CalibrationModel, FitError> {
    if points.is_empty() {
        return Err(FitError::NoTrainableSamples);
    }

    let mut best: Option<CalibrationModel> = None;
    let mut last_err = FitError::NoTrainableSamples;
    for &family in families {
        match fit_model(family, points, total_samples, settings) {
            Ok(candidate) => {
                let replace = best
                    .as_ref()
                    .is_none_or(|current| settings.criterion.is_better(&candidate, current));
                if replace {
                    best = Some(candidate);
                }
            }
            Err(e) => last_err = e,
        }
    }
    best.ok_or(last_err)
}

/// Retrain: fit the configured family on the scoped samples.
pub fn train(samples: &[CalibrationSample], settings: &FitSettings) -> Result<CalibrationModel, FitError> {
    let points = training_points(samples, settings);
    train_candidates(&[settings.family], &points, samples.len(), settings)
}
