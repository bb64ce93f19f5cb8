use thiserror::Error;

use super::config::ConfigError;
use super::superposition::FitError;
use crate::core::models::error::EnsembleError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Precondition not met: {0}")]
    Precondition(String),

    #[error("No transformation recorded for conformation {index}")]
    TransformationMissing { index: usize },

    #[error("Superposition of conformation {index} failed: {source}")]
    Fit {
        index: usize,
        #[source]
        source: FitError,
    },

    #[error("Iterative superposition did not converge after {iterations} iterations (last RMSD {rmsd:.6})")]
    Convergence { iterations: usize, rmsd: f64 },

    #[error("Ensemble error: {source}")]
    Ensemble {
        #[from]
        source: EnsembleError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}
