#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;

use capscale_core::{CalibrationEngine, FeatureMode, ModelFamily};

#[derive(Debug, Arbitrary)]
struct Input {
    family: u8,
    feature: u8,
    inverse: bool,
    sigma: f64,
    lambda: f64,
    tare: i32,
    samples: Vec<(f64, i32)>,
    probe: i32,
}

fuzz_target!(|input: Input| {
    let mut engine = CalibrationEngine::default();
    let mut fit = engine.config().fit;
    fit.family = ModelFamily::ALL[usize::from(input.family) % ModelFamily::ALL.len()];
    fit.feature = FeatureMode::ALL[usize::from(input.feature) % FeatureMode::ALL.len()];
    fit.inverse = input.inverse;
    fit.outlier_sigma = input.sigma;
    fit.ridge_lambda = input.lambda;
    engine.update_fit_settings(fit);
    engine.set_tare_counts(input.tare);

    for (w, raw) in input.samples.into_iter().take(64) {
        engine.add_sample(w, raw);
    }
    engine.apply_recommended_model();
    let _ = engine.live_reading(input.probe);
    let _ = engine.sample_rows();
    let _ = engine.fit_overlay();
});
