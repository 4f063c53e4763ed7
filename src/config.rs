//! A module for loading and validating rainflow run configurations.

use anyhow::Context;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::matrix::MatrixParams;
use crate::timeseries::TimeSeries;

/// Represents an error that can occur during validation of configuration data.
#[derive(Debug)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a given message.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error.
    pub fn new(message: &str) -> ValidationError {
        ValidationError {
            message: message.to_owned(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Represents the configuration of one rainflow run.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub solution: Solution,
    /// Matrix shape and binning, required when `solution.mode` is `MATRIX`.
    #[serde(default)]
    pub matrix: Option<MatrixParams>,
    pub timeseries: TimeSeries,
}

impl Config {
    /// Validates the entire configuration.
    ///
    /// This checks the solution, every load case of the time series, and the
    /// matrix parameters when the run produces matrices.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.solution.validate()?;
        self.timeseries.validate()?;
        match (self.solution.mode, &self.matrix) {
            (Mode::Matrix, Some(params)) => validate_matrix(params),
            (Mode::Matrix, None) => Err(ValidationError::new("mode MATRIX needs a matrix section")),
            (Mode::Cycles, _) => Ok(()),
        }
    }
}

/// What a run produces for every load case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Every closed cycle, streamed to a CSV file.
    Cycles,
    /// One rainflow matrix, written as JSON.
    Matrix,
}

/// Represents the solution settings: what to compute and where to put it.
#[derive(Debug, Deserialize)]
pub struct Solution {
    pub mode: Mode,
    /// Directory receiving one output file per load case.
    pub output: String,
}

impl Solution {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.output.trim().is_empty() {
            return Err(ValidationError::new("output must not be empty"));
        }
        Ok(())
    }
}

/// Validates matrix parameters for a configured run.
///
/// Stricter than [`MatrixParams::validate`]: a configuration must also give
/// finite lower edges and positive bin sizes.
///
/// # Examples
///
/// ```
/// use rflow::config::validate_matrix;
/// use rflow::matrix::MatrixParams;
///
/// let params = MatrixParams {
///     amp_bin_count: 8,
///     mean_bin_count: 4,
///     mean_min: -10.0,
///     amp_min: 0.0,
///     mean_bin_size: 5.0,
///     amp_bin_size: 2.5,
/// };
/// assert!(validate_matrix(&params).is_ok());
///
/// let flat = MatrixParams { amp_bin_size: 0.0, ..params };
/// assert!(validate_matrix(&flat).is_err());
/// ```
pub fn validate_matrix(params: &MatrixParams) -> Result<(), ValidationError> {
    params
        .validate()
        .map_err(|e| ValidationError::new(&e.to_string()))?;
    if !(params.amp_bin_size > 0.0 && params.amp_bin_size.is_finite()) {
        return Err(ValidationError::new(&format!(
            "amp_bin_size must be greater than 0.0, got {}",
            params.amp_bin_size
        )));
    }
    if !(params.mean_bin_size > 0.0 && params.mean_bin_size.is_finite()) {
        return Err(ValidationError::new(&format!(
            "mean_bin_size must be greater than 0.0, got {}",
            params.mean_bin_size
        )));
    }
    if !params.amp_min.is_finite() || !params.mean_min.is_finite() {
        return Err(ValidationError::new("amp_min and mean_min must be finite"));
    }
    Ok(())
}

/// Loads the configuration from a YAML file, or a TOML file when the path
/// ends in `.toml`.
///
/// # Errors
///
/// This function will return an error if reading or parsing the configuration file fails.
pub fn load_config<P: AsRef<Path>>(config_path: P) -> anyhow::Result<Config> {
    let path = config_path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read configuration {}", path.display()))?;
    let config: Config = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("invalid TOML in {}", path.display()))?,
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in {}", path.display()))?,
    };
    Ok(config)
}
