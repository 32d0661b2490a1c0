//! `fit`: replay a recorded session through the engine.

use std::path::Path;

use capscale_core::{CalibrationEngine, EngineConfig};
use serde_json::json;

use crate::report;

/// Feed every CSV row to a fresh engine as a tare + add-sample event.
pub fn replay_session(cfg: &capscale_config::Config, samples: &Path) -> eyre::Result<CalibrationEngine> {
    let rows = capscale_config::load_session_csv(samples)?;
    let mut engine = CalibrationEngine::builder()
        .with_config(EngineConfig::from(cfg))
        .try_build()?;
    for row in &rows {
        engine.set_tare_counts(row.tare);
        engine.add_sample(row.real_weight_g, row.adc_raw);
    }
    tracing::info!(rows = rows.len(), model = engine.advisory_model().is_some(), "session replayed");
    Ok(engine)
}

pub fn run_fit(
    cfg: &capscale_config::Config,
    samples: &Path,
    export: Option<&Path>,
    json: bool,
) -> eyre::Result<()> {
    let engine = replay_session(cfg, samples)?;
    if let Some(path) = export {
        report::export_samples(&engine, path)?;
    }

    let model = engine.advisory_model();
    if json {
        let out = json!({
            "samples": engine.samples().len(),
            "model": report::model_json(model)?,
            "rows": report::rows_json(&engine.sample_rows())?,
        });
        println!("{out}");
    } else {
        println!("samples: {}", engine.samples().len());
        println!("{}", report::model_text(model));
        if !engine.samples().is_empty() {
            println!("{}", report::rows_text(&engine.sample_rows()));
        }
        if let Some(path) = export {
            println!("exported: {}", path.display());
        }
    }
    Ok(())
}
