use thiserror::Error;

use crate::model::ModelFamily;

/// Why a fit produced no model. All variants are recoverable: the selector turns
/// them into "no model" and the runtime keeps using the fallback calibration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("{family} fit needs at least {needed} samples, got {got}")]
    InsufficientSamples {
        family: ModelFamily,
        needed: usize,
        got: usize,
    },
    #[error("normal equations are singular (pivot below tolerance)")]
    SingularSystem,
    #[error("nonlinear fit ended with a non-finite loss")]
    NonFiniteLoss,
    #[error("no trainable samples")]
    NoTrainableSamples,
}

/// Failure of a collaborator the engine called. Invalid operator input is a
/// silent no-op and never becomes an error.
#[derive(Debug, Error, Clone)]
pub enum EngineError {
    #[error("reading source error: {0}")]
    Source(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
