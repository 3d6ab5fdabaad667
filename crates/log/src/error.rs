//! Logger setup errors

use thiserror::Error;

/// Result alias for logger setup
pub type LogResult<T> = Result<T, LogError>;

/// Errors raised while building or installing the subscriber
#[derive(Debug, Error)]
pub enum LogError {
    /// Level directive could not be parsed
    #[error("Invalid filter '{filter}': {reason}")]
    Filter {
        /// Directive as configured
        filter: String,
        /// Parser message
        reason: String,
    },

    /// Output format name is not recognized
    #[error("Unknown log format '{0}', expected pretty, compact or json")]
    Format(String),

    /// A global subscriber was already installed
    #[error("Logger initialization failed: {reason}")]
    Init {
        /// Underlying error message
        reason: String,
    },
}
