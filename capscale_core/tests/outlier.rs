use capscale_core::config::FitSettings;
use capscale_core::select::fit_model;
use capscale_core::{ModelFamily, TrainingPoint};

fn line_with_outlier() -> Vec<TrainingPoint> {
    let mut pts: Vec<_> = (1..=5)
        .map(|i| {
            let x = f64::from(i);
            TrainingPoint::new(x, 2.0 * x)
        })
        .collect();
    pts.push(TrainingPoint::new(6.0, 40.0));
    pts
}

fn settings(sigma: f64) -> FitSettings {
    FitSettings {
        outlier_sigma: sigma,
        ..FitSettings::default()
    }
}

#[test]
fn sigma_two_drops_the_outlier_and_refits() {
    let pts = line_with_outlier();
    let unfiltered = fit_model(ModelFamily::Linear, &pts, 6, &settings(0.0)).unwrap();
    let filtered = fit_model(ModelFamily::Linear, &pts, 6, &settings(2.0)).unwrap();

    assert_eq!(unfiltered.used_samples, 6);
    assert_eq!(filtered.used_samples, 5);
    assert_eq!(filtered.total_samples, 6);

    let inlier_slope = 2.0;
    let err_filtered = (filtered.coefficients()[0] - inlier_slope).abs();
    let err_unfiltered = (unfiltered.coefficients()[0] - inlier_slope).abs();
    assert!(err_filtered < 1e-9, "filtered slope {}", filtered.coefficients()[0]);
    assert!(err_unfiltered > 1.0);
    assert!(filtered.rmse < 1e-9);
}

#[test]
fn fewer_than_four_points_are_never_trimmed() {
    let pts = [
        TrainingPoint::new(1.0, 2.0),
        TrainingPoint::new(2.0, 4.0),
        TrainingPoint::new(3.0, 30.0),
    ];
    let model = fit_model(ModelFamily::Linear, &pts, 3, &settings(0.1)).unwrap();
    assert_eq!(model.used_samples, 3);
}

#[test]
fn uniform_residuals_keep_everything() {
    let pts: Vec<_> = (1..=6)
        .map(|i| {
            let x = f64::from(i);
            TrainingPoint::new(x, 0.5 * x)
        })
        .collect();
    let model = fit_model(ModelFamily::Linear, &pts, 6, &settings(0.5)).unwrap();
    assert_eq!(model.used_samples, 6);
}

#[test]
fn trim_below_family_minimum_keeps_unfiltered_fit() {
    // a tiny sigma would leave fewer than 3 points for the exponential family
    let pts: Vec<_> = [(0.0, 1.0), (1.0, 3.0), (2.0, 2.0), (3.0, 9.0)]
        .iter()
        .map(|&(x, y)| TrainingPoint::new(x, y))
        .collect();
    let s = FitSettings {
        family: ModelFamily::Exponential,
        outlier_sigma: 1e-9,
        ..FitSettings::default()
    };
    let model = fit_model(ModelFamily::Exponential, &pts, 4, &s).unwrap();
    assert_eq!(model.used_samples, 4);
}
