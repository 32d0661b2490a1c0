//! `From` implementations bridging `capscale_config` types to `capscale_core` types.

use crate::config::{AcquisitionCfg, EngineConfig, FallbackCalibration, FitSettings, average_count_from};
use crate::feature::FeatureMode;
use crate::model::ModelFamily;
use crate::reference::ReferenceModel;
use crate::select::{Criterion, SampleScope};

// ── enums ────────────────────────────────────────────────────────────────────

impl From<capscale_config::Family> for ModelFamily {
    fn from(f: capscale_config::Family) -> Self {
        match f {
            capscale_config::Family::Linear => ModelFamily::Linear,
            capscale_config::Family::Quadratic => ModelFamily::Quadratic,
            capscale_config::Family::Exponential => ModelFamily::Exponential,
        }
    }
}

impl From<capscale_config::Criterion> for Criterion {
    fn from(c: capscale_config::Criterion) -> Self {
        match c {
            capscale_config::Criterion::Rmse => Criterion::Rmse,
            capscale_config::Criterion::Mae => Criterion::Mae,
            capscale_config::Criterion::Maxerr => Criterion::MaxErr,
            capscale_config::Criterion::R2 => Criterion::R2,
        }
    }
}

impl From<capscale_config::Scope> for SampleScope {
    fn from(s: capscale_config::Scope) -> Self {
        match s {
            capscale_config::Scope::All => SampleScope::All,
            capscale_config::Scope::ActiveModel => SampleScope::ActiveModel,
        }
    }
}

impl From<capscale_config::Feature> for FeatureMode {
    fn from(f: capscale_config::Feature) -> Self {
        match f {
            capscale_config::Feature::Delta => FeatureMode::Delta,
            capscale_config::Feature::AbsDelta => FeatureMode::AbsDelta,
            capscale_config::Feature::AdcRaw => FeatureMode::AdcRaw,
            capscale_config::Feature::LogAbsDelta => FeatureMode::LogAbsDelta,
        }
    }
}

// ── FitSettings ──────────────────────────────────────────────────────────────

impl From<&capscale_config::Config> for FitSettings {
    fn from(c: &capscale_config::Config) -> Self {
        Self {
            family: c.model.family.into(),
            criterion: c.model.criterion.into(),
            scope: c.model.scope.into(),
            inverse: c.model.inverse,
            feature: c.model.feature.into(),
            outlier_sigma: c.fit.outlier_sigma,
            ridge_lambda: c.fit.ridge_lambda,
            reference_delta_counts: c.fit.reference_delta_counts,
        }
        .sanitized()
    }
}

// ── AcquisitionCfg ───────────────────────────────────────────────────────────

impl From<&capscale_config::AcquisitionCfg> for AcquisitionCfg {
    fn from(c: &capscale_config::AcquisitionCfg) -> Self {
        Self {
            average_count: average_count_from(c.average_count),
            tare_average_count: c.tare_average_count.max(1),
        }
    }
}

// ── ReferenceModel ───────────────────────────────────────────────────────────

impl From<&capscale_config::ReferenceCfg> for ReferenceModel {
    fn from(c: &capscale_config::ReferenceCfg) -> Self {
        Self::new(c.a, c.b, c.c0)
    }
}

// ── FallbackCalibration ──────────────────────────────────────────────────────

impl From<&capscale_config::FallbackCfg> for FallbackCalibration {
    fn from(c: &capscale_config::FallbackCfg) -> Self {
        Self {
            factor: c.factor,
            offset: c.offset,
        }
    }
}

// ── EngineConfig ─────────────────────────────────────────────────────────────

impl From<&capscale_config::Config> for EngineConfig {
    fn from(c: &capscale_config::Config) -> Self {
        Self {
            fit: FitSettings::from(c),
            acquisition: (&c.acquisition).into(),
            reference: (&c.reference).into(),
            fallback: (&c.fallback).into(),
        }
    }
}
