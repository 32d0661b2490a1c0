//! Human and JSON rendering of models and samples; sample-table export.

use std::path::Path;

use capscale_core::{CalibrationEngine, CalibrationModel, LiveReading, SampleRow};
use eyre::WrapErr;
use serde_json::Value;

use crate::atomic::write_atomic;

/// Column order of the exported sample table.
pub const EXPORT_HEADERS: [&str; 15] = [
    "id",
    "timestamp",
    "real_weight_g",
    "adc_raw",
    "delta_counts",
    "feature_key",
    "feature_value",
    "reference_capacity_pf",
    "predicted_capacity_pf",
    "predicted_weight_g",
    "active_capacity_pf",
    "active_weight_g",
    "capacity_error_pf",
    "weight_error_g",
    "model_tag",
];

/// The model as JSON; `null` when there is none.
pub fn model_json(model: Option<&CalibrationModel>) -> serde_json::Result<Value> {
    serde_json::to_value(model)
}

pub fn model_text(model: Option<&CalibrationModel>) -> String {
    let Some(m) = model else {
        return "model: - (no model, fallback calibration in use)".to_string();
    };
    let coeffs = m
        .coefficients()
        .iter()
        .map(|c| format!("{c:.6e}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "model: {} [{}]\n  coefficients: [{coeffs}]\n  factor @ {}: {:.6e}  offset: {:.4} pF\n  samples: {}/{}  mae: {:.4}  rmse: {:.4}  max|e|: {:.4} pF  r2: {:.5}",
        m.label(),
        m.feature,
        m.reference_delta_counts,
        m.factor,
        m.offset,
        m.used_samples,
        m.total_samples,
        m.mae,
        m.rmse,
        m.max_abs_error,
        m.r2
    )
}

/// Sample rows as a JSON array, each sample flattened next to its active predictions.
pub fn rows_json(rows: &[SampleRow<'_>]) -> serde_json::Result<Value> {
    serde_json::to_value(rows)
}

pub fn rows_text(rows: &[SampleRow<'_>]) -> String {
    let mut out = String::from(
        "  #   real g   Cref pF   Cact pF    m act g    adc  delta    feature  model               dC pF     dm g",
    );
    for (i, row) in rows.iter().enumerate() {
        let s = row.sample;
        out.push_str(&format!(
            "\n{:>3} {:>8.1} {:>9.4} {:>9.4} {:>10.1} {:>6} {:>6} {:>10.4}  {:<18} {:>8.4} {:>8.1}",
            i + 1,
            s.real_weight_g,
            s.reference_capacity_pf,
            row.active_capacity_pf,
            row.active_weight_g,
            s.adc_raw,
            s.delta_counts,
            s.feature_value,
            s.model_tag.label(),
            row.capacity_error_pf,
            row.weight_error_g
        ));
    }
    out
}

pub fn live_json(r: &LiveReading) -> serde_json::Result<Value> {
    serde_json::to_value(r)
}

pub fn live_text(r: &LiveReading) -> String {
    format!(
        "adc {}  delta {}  C {:.4} pF  m {:.3} g",
        r.adc_raw, r.delta_counts, r.capacity_pf, r.weight_g
    )
}

/// Render the sample table as CSV bytes.
pub fn samples_csv(engine: &CalibrationEngine) -> eyre::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(EXPORT_HEADERS)?;
    for row in engine.sample_rows() {
        let s = row.sample;
        wtr.write_record([
            s.id.to_string(),
            s.timestamp.to_rfc3339(),
            s.real_weight_g.to_string(),
            s.adc_raw.to_string(),
            s.delta_counts.to_string(),
            s.feature.as_str().to_string(),
            s.feature_value.to_string(),
            s.reference_capacity_pf.to_string(),
            s.predicted_capacity_pf.to_string(),
            s.predicted_weight_g.to_string(),
            row.active_capacity_pf.to_string(),
            row.active_weight_g.to_string(),
            row.capacity_error_pf.to_string(),
            row.weight_error_g.to_string(),
            s.model_tag.to_string(),
        ])?;
    }
    wtr.into_inner()
        .map_err(|e| eyre::eyre!("flush sample table: {e}"))
}

/// Export the sample table atomically.
pub fn export_samples(engine: &CalibrationEngine, path: &Path) -> eyre::Result<()> {
    let bytes = samples_csv(engine)?;
    write_atomic(path, &bytes).wrap_err_with(|| format!("write sample table {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = engine.samples().len(), "sample table exported");
    Ok(())
}
