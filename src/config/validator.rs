use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{Result, ValidationError, WmipfError};

/// Largest window depth accepted; windows grow linearly with depth
const MAX_WINDOW_DEPTH: usize = 64;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration, collecting every problem found
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_scan(config, &mut errors);
        Self::validate_report(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(WmipfError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_scan(config: &Config, errors: &mut Vec<ValidationError>) {
        let depth = config.scan.window_depth;
        if depth == 0 || depth > MAX_WINDOW_DEPTH {
            errors.push(ValidationError::new(
                "scan.window_depth",
                format!(
                    "Window depth must be between 1 and {}, got {}",
                    MAX_WINDOW_DEPTH, depth
                ),
            ));
        }
    }

    fn validate_report(config: &Config, errors: &mut Vec<ValidationError>) {
        for (idx, entry) in config.report.benign_bindings.iter().enumerate() {
            if entry.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("report.benign_bindings[{}]", idx),
                    "Allow-list entries cannot be empty",
                ));
            }
        }
    }
}
