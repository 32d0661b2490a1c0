#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and calibration-session parsing for the capacitive scale.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The session CSV loader enforces headers and rejects rows that cannot be
//!   replayed (non-finite or negative reference weights).
use serde::Deserialize;

/// Calibration session CSV schema.
///
/// Expected headers:
/// real_weight_g,adc_raw,tare
///
/// Example:
/// real_weight_g,adc_raw,tare
/// 0.0,1000,1000
/// 100.0,1200,1000
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct SessionRow {
    pub real_weight_g: f64,
    pub adc_raw: i32,
    pub tare: i32,
}

/// Header row the session CSV must carry, in order.
pub const SESSION_HEADERS: [&str; 3] = ["real_weight_g", "adc_raw", "tare"];

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    #[default]
    Linear,
    Quadratic,
    Exponential,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    #[default]
    Rmse,
    Mae,
    Maxerr,
    R2,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    All,
    ActiveModel,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    #[default]
    Delta,
    AbsDelta,
    AdcRaw,
    LogAbsDelta,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ModelCfg {
    pub family: Family,
    pub criterion: Criterion,
    pub scope: Scope,
    /// Fit against `sign(x)/(|x|+eps)` instead of the raw feature.
    pub inverse: bool,
    pub feature: Feature,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FitCfg {
    /// Residual sigma multiple for outlier trimming (0 disables).
    pub outlier_sigma: f64,
    /// Ridge penalty added to the normal-equation diagonal.
    pub ridge_lambda: f64,
    /// Feature value at which the local sensitivity is reported.
    pub reference_delta_counts: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AcquisitionCfg {
    /// Readings averaged per sample; rounded and floored at 1 by the engine.
    pub average_count: f64,
    /// Readings averaged when capturing the tare baseline.
    pub tare_average_count: u32,
}

impl Default for AcquisitionCfg {
    fn default() -> Self {
        Self {
            average_count: 16.0,
            tare_average_count: 16,
        }
    }
}

/// Reference physical model `C(w) = a*exp(b*w) + c0` (pF over grams).
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ReferenceCfg {
    pub a: f64,
    pub b: f64,
    pub c0: f64,
}

impl Default for ReferenceCfg {
    fn default() -> Self {
        Self {
            a: 2.95,
            b: 0.00162,
            c0: 14.59,
        }
    }
}

/// Manual linear calibration used while no fitted model is applied.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct FallbackCfg {
    /// grams per count
    pub factor: f64,
    /// additive offset in grams
    pub offset: f64,
}

impl Default for FallbackCfg {
    fn default() -> Self {
        Self {
            factor: 0.0005,
            offset: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SensorCfg {
    /// Channel-0 counts with an empty pan
    pub zero_counts: i32,
    pub counts_per_pf: f64,
    /// Peak uniform noise per conversion, in counts (0 disables)
    pub noise_counts: f64,
    pub seed: u32,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            zero_counts: 1000,
            counts_per_pf: 50.0,
            noise_counts: 0.0,
            seed: 1,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelCfg,
    #[serde(default)]
    pub fit: FitCfg,
    #[serde(default)]
    pub acquisition: AcquisitionCfg,
    #[serde(default)]
    pub reference: ReferenceCfg,
    #[serde(default)]
    pub fallback: FallbackCfg,
    /// Simulated sensor parameters (CLI backend)
    #[serde(default)]
    pub sensor: SensorCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_session_csv(path: &std::path::Path) -> eyre::Result<Vec<SessionRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open session CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != SESSION_HEADERS {
        eyre::bail!(
            "session CSV must have headers '{}', got: {}",
            SESSION_HEADERS.join(","),
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<SessionRow>().enumerate() {
        let line = idx + 2;
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", line, e))?;
        if !row.real_weight_g.is_finite() || row.real_weight_g < 0.0 {
            eyre::bail!(
                "invalid CSV row {}: real_weight_g must be a finite, non-negative number",
                line
            );
        }
        rows.push(row);
    }

    if rows.is_empty() {
        eyre::bail!("session CSV {:?} has no rows", path);
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Fit
        if !self.fit.outlier_sigma.is_finite() || self.fit.outlier_sigma < 0.0 {
            eyre::bail!("fit.outlier_sigma must be a finite number >= 0");
        }
        if !self.fit.ridge_lambda.is_finite() || self.fit.ridge_lambda < 0.0 {
            eyre::bail!("fit.ridge_lambda must be a finite number >= 0");
        }
        if !self.fit.reference_delta_counts.is_finite() {
            eyre::bail!("fit.reference_delta_counts must be finite");
        }

        // Acquisition
        if !self.acquisition.average_count.is_finite() {
            eyre::bail!("acquisition.average_count must be finite");
        }
        if self.acquisition.tare_average_count == 0 {
            eyre::bail!("acquisition.tare_average_count must be >= 1");
        }

        // Reference model
        let r = &self.reference;
        if !(r.a.is_finite() && r.b.is_finite() && r.c0.is_finite()) {
            eyre::bail!("reference.a, reference.b and reference.c0 must be finite");
        }

        // Fallback
        if !(self.fallback.factor.is_finite() && self.fallback.offset.is_finite()) {
            eyre::bail!("fallback.factor and fallback.offset must be finite");
        }

        // Sensor
        if !self.sensor.counts_per_pf.is_finite() || self.sensor.counts_per_pf == 0.0 {
            eyre::bail!("sensor.counts_per_pf must be finite and non-zero");
        }
        if !self.sensor.noise_counts.is_finite() || self.sensor.noise_counts < 0.0 {
            eyre::bail!("sensor.noise_counts must be a finite number >= 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
