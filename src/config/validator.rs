//! Configuration validation.
//!
//! Checks a loaded [`PlanSyncConfig`] for values that deserialize fine but
//! cannot be used.

use tracing::debug;

use crate::error::{ConfigError, PlanSyncError, Result};

use super::spec::PlanSyncConfig;

/// Simulator latency above which a warning is emitted.
const MAX_REASONABLE_LATENCY_MS: u64 = 10_000;

/// Validator for plansync configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any were found.
    pub fn validate(&self, config: &PlanSyncConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_document(config, &mut result);
        Self::validate_storage(config, &mut result);
        Self::validate_simulator(config, &mut result);

        if result.errors.is_empty() {
            debug!(
                "Configuration validation passed with {} warning(s)",
                result.warning_count()
            );
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(PlanSyncError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        }
    }

    fn validate_document(config: &PlanSyncConfig, result: &mut ValidationResult) {
        let name = &config.document.ground_station;
        if name.trim().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("document.ground_station"),
                message: String::from("Ground station name cannot be empty"),
            });
        } else if name.chars().any(char::is_control) {
            result.errors.push(ValidationError {
                field: String::from("document.ground_station"),
                message: String::from("Ground station name cannot contain control characters"),
            });
        }
    }

    fn validate_storage(config: &PlanSyncConfig, result: &mut ValidationResult) {
        if config.storage.plan_dir.as_os_str().is_empty() {
            result.errors.push(ValidationError {
                field: String::from("storage.plan_dir"),
                message: String::from("Plan directory cannot be empty"),
            });
        }
    }

    fn validate_simulator(config: &PlanSyncConfig, result: &mut ValidationResult) {
        let latency = config.simulator.latency_ms;
        if latency > MAX_REASONABLE_LATENCY_MS {
            result.warnings.push(format!(
                "simulator.latency_ms: {latency} ms per transfer makes every cascade very slow"
            ));
        }
    }
}

impl ValidationResult {
    /// Returns true if there are no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        let result = ConfigValidator::new()
            .validate(&PlanSyncConfig::default())
            .expect("defaults are valid");
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_empty_ground_station() {
        let mut config = PlanSyncConfig::default();
        config.document.ground_station = String::from("  ");

        let err = ConfigValidator::new()
            .validate(&config)
            .expect_err("empty name is rejected");
        assert!(matches!(
            err,
            PlanSyncError::Config(ConfigError::ValidationError { field: Some(ref f), .. })
                if f == "document.ground_station"
        ));
    }

    #[test]
    fn test_empty_plan_dir() {
        let mut config = PlanSyncConfig::default();
        config.storage.plan_dir = PathBuf::new();
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_slow_simulator_warns() {
        let mut config = PlanSyncConfig::default();
        config.simulator.latency_ms = 60_000;

        let result = ConfigValidator::new()
            .validate(&config)
            .expect("latency is only a warning");
        assert_eq!(result.warning_count(), 1);
        assert!(result.warnings[0].starts_with("simulator.latency_ms"));
    }
}
