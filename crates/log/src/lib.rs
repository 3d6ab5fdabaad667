//! Locksmith Log
//!
//! One place to configure `tracing` output for locksmith binaries: an
//! `EnvFilter` directive, one of three output formats and a few display
//! switches.
//!
//! ```no_run
//! use locksmith_log::Config;
//!
//! locksmith_log::init(Config::production()).expect("logger");
//! tracing::info!(secret_id = "a1b2c3d4e5f6", "Secret rotated");
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builder;
mod config;
mod error;

pub use builder::{LocksmithSubscriber, LoggerBuilder};
pub use config::{Config, DisplayConfig, Format, WriterConfig};
pub use error::{LogError, LogResult};

/// Install a global subscriber for `config`
///
/// # Errors
///
/// * `LogError::Filter` if the level directive does not parse
/// * `LogError::Init` if a global subscriber is already set
pub fn init(config: Config) -> LogResult<()> {
    LoggerBuilder::from_config(config).build()
}
