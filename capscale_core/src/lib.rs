#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::must_use_candidate
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Calibration model fitting for a capacitive weighing instrument (hardware-agnostic).
//!
//! Operators place known reference weights on the sensor; every averaged raw
//! reading becomes a sample pairing a signal feature with the capacitance the
//! reference model predicts for that weight. The engine fits a model to those
//! pairs and, once the operator applies it, converts live readings to weight.
//! Raw readings come in through `capscale_traits::RawReadingSource`.
//!
//! ## Architecture
//!
//! - **Feature extraction**: `feature::FeatureMode`
//! - **Reference model**: `C(w) = a * exp(b * w) + c0` (`reference` module)
//! - **Solver**: Gauss-Jordan with partial pivoting (`linalg`)
//! - **Fitting**: ridge normal equations and exponential gradient descent (`fit`)
//! - **Outliers / metrics / selection**: `outlier`, `evaluate`, `select`
//! - **Runtime**: applied model or linear fallback (`runtime`)
//! - **Engine**: `CalibrationEngine`, the stateful operator-facing API
//!
//! ```
//! use capscale_core::CalibrationEngine;
//!
//! let mut engine = CalibrationEngine::default();
//! engine.set_tare_counts(1000);
//! engine.add_sample(0.0, 1000);
//! engine.add_sample(100.0, 1200);
//! assert!(engine.advisory_model().is_some());
//! assert!(engine.apply_recommended_model());
//! assert!(engine.predict_weight(1200).is_finite());
//! ```

pub mod config;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod feature;
pub mod fit;
pub mod linalg;
pub mod mocks;
pub mod model;
pub mod outlier;
pub mod reference;
pub mod runtime;
pub mod sample;
pub mod select;

pub use config::{AcquisitionCfg, EngineConfig, FallbackCalibration, FitSettings};
pub use engine::{CalibrationEngine, CalibrationEngineBuilder, FitOverlay, LiveReading, SampleRow};
pub use error::{BuildError, EngineError, FitError, ParseError};
pub use evaluate::FitMetrics;
pub use feature::FeatureMode;
pub use model::{CalibrationModel, Curve, ModelFamily, ModelTag, transform};
pub use reference::ReferenceModel;
pub use runtime::{Estimate, RuntimePredictor};
pub use sample::{CalibrationSample, SampleId, SampleStore, TrainingPoint};
pub use select::{Criterion, SampleScope};
