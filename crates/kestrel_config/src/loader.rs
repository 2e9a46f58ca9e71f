//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// File name looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "kestrel.toml";

/// Loads and validates `kestrel.toml` from a project directory.
///
/// A missing file is not an error: the defaults are returned instead.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(ProjectConfig::default());
    }
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kestrel.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks ranges and mutually exclusive settings.
pub fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    let sim = &config.simulation;
    if sim.workers == 0 {
        return Err(ConfigError::ValidationError(
            "simulation.workers must be at least 1".to_string(),
        ));
    }
    if sim.vectors == Some(0) {
        return Err(ConfigError::ValidationError(
            "simulation.vectors must be positive".to_string(),
        ));
    }
    if sim.vectors.is_some() && sim.input_vectors.is_some() {
        return Err(ConfigError::Conflict(
            "simulation.vectors and simulation.input_vectors".to_string(),
        ));
    }
    if let Some(percent) = sim.min_coverage {
        if !(percent > 0.0 && percent <= 100.0) {
            return Err(ConfigError::ValidationError(format!(
                "simulation.min_coverage must be a percentage in (0, 100], got {percent}"
            )));
        }
    }
    if let Some(pattern) = sim.monitor.iter().find(|p| p.trim().is_empty()) {
        return Err(ConfigError::ValidationError(format!(
            "empty monitor pattern '{pattern}'"
        )));
    }
    Ok(())
}
