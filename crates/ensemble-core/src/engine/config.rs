use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 1e-4;
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignmentMode {
    /// Fit every conformation onto the current reference once.
    #[default]
    Single,
    /// Refine the reference toward the ensemble mean until it stops moving.
    Iterative,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct AlignmentConfig {
    pub mode: AlignmentMode,
    /// Reference RMSD change at or below which iterative superposition stops.
    pub convergence_threshold: f64,
    pub max_iterations: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            mode: AlignmentMode::Single,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl AlignmentConfig {
    pub fn iterative() -> Self {
        Self {
            mode: AlignmentMode::Iterative,
            ..Self::default()
        }
    }

    /// Loads and validates a configuration from a TOML file. Keys absent from the file
    /// take their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<string>")
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: origin.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.convergence_threshold.is_finite() || self.convergence_threshold <= 0.0 {
            return Err(ConfigError::InvalidValue {
                parameter: "convergence_threshold",
                reason: format!("must be a positive number, got {}", self.convergence_threshold),
            });
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct AlignmentConfigBuilder {
    mode: Option<AlignmentMode>,
    convergence_threshold: Option<f64>,
    max_iterations: Option<usize>,
}

impl AlignmentConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: AlignmentMode) -> Self {
        self.mode = Some(mode);
        self
    }
    pub fn convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = Some(threshold);
        self
    }
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    pub fn build(self) -> Result<AlignmentConfig, ConfigError> {
        let config = AlignmentConfig {
            mode: self.mode.ok_or(ConfigError::MissingParameter("mode"))?,
            convergence_threshold: self
                .convergence_threshold
                .unwrap_or(DEFAULT_CONVERGENCE_THRESHOLD),
            max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
        };
        config.validate()?;
        Ok(config)
    }
}
