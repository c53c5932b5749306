//! Error types for Project Umbra.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Umbra operations.
#[derive(Debug, Error)]
pub enum UmbraError {
    /// Unit setup was rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Designer/content misconfiguration detected while setting up a unit.
///
/// These are fatal to the unit's setup: they are reported at initialization
/// and never degrade silently at runtime.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required collaborator was not supplied
    #[error("Missing required collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// Boss phase fractions do not add up to the whole health bar
    #[error("Phase fractions must sum to 1.0 (got {sum})")]
    PhaseFractions {
        /// Actual sum of the configured fractions
        sum: f32,
    },

    /// Boss has no phases configured
    #[error("Boss must configure at least one phase")]
    NoPhases,

    /// Patrol route without waypoints
    #[error("Waypoint list for '{0}' is empty")]
    EmptyWaypoints(String),

    /// Multi-emitter attack without emitters
    #[error("Emitter array for '{0}' is empty")]
    EmptyEmitters(String),

    /// Numeric setting outside its valid range
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Failed to read a profile file
    #[error("Failed to read profile '{path}': {source}")]
    Read {
        /// Path of the file
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse profile TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidValue`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type alias for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for Umbra operations.
pub type UmbraResult<T> = Result<T, UmbraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_wraps_into_top_level() {
        let err: UmbraError = ConfigError::invalid("dwell", "must be >= 0").into();
        assert!(matches!(err, UmbraError::Config(ConfigError::InvalidValue { .. })));
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid value for 'dwell': must be >= 0"
        );
    }

    #[test]
    fn test_parse_error_converts() {
        let parse = toml::from_str::<toml::Value>("= nope").expect_err("invalid toml");
        let err = ConfigError::from(parse);
        assert!(err.to_string().starts_with("Failed to parse profile TOML"));
    }
}
