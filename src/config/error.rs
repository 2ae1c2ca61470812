//! Configuration error types.

use thiserror::Error;

use crate::fusion::FusionError;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// Fusion weights or limits are invalid.
    #[error("invalid fusion configuration: {0}")]
    Fusion(#[from] FusionError),

    /// A field holds a value outside its allowed range.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// A required collaborator was not supplied to the engine builder.
    #[error("missing component: {0}")]
    MissingComponent(&'static str),
}
