//! Layered application configuration
//!
//! Sources, lowest to highest precedence: built-in defaults, the TOML file,
//! `LOCKSMITH_*` environment variables (`__` separates nested keys, e.g.
//! `LOCKSMITH_POLICY__GRACE_PERIOD=48h`) and command-line flags.

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format as _, Serialized, Toml};
use locksmith_jwt::JwtConfig;
use locksmith_rotation::RotationPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "locksmith.toml";

/// Full configuration of the `locksmith` binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where secrets are persisted
    pub store: StoreSettings,
    /// Rotation interval and grace period
    pub policy: RotationPolicy,
    /// Token signing settings
    pub jwt: JwtConfig,
    /// Logger settings
    pub log: locksmith_log::Config,
}

/// Storage backend selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Backend kind
    pub kind: StoreKind,
    /// Directory for the local backend; relative paths resolve against the
    /// working directory
    pub path: Option<PathBuf>,
}

/// Available storage backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// One file per secret in a directory
    #[default]
    Local,
    /// Process memory; nothing survives the command
    Memory,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub log_format: Option<locksmith_log::Format>,
    pub store_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from every layer
    ///
    /// A missing file is only an error when it was named explicitly.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let path = match file {
            Some(path) if !path.exists() => {
                bail!("config file {} does not exist", path.display())
            }
            Some(path) => path,
            None => Path::new(DEFAULT_CONFIG_FILE),
        };

        Self::figment(path, overrides)
            .extract()
            .with_context(|| format!("invalid configuration (file {})", path.display()))
    }

    fn figment(path: &Path, overrides: &Overrides) -> Figment {
        // `LOCKSMITH_LOG` alone is a filter directive, not the `log` table
        let mut figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("LOCKSMITH_").ignore(&["log"]).split("__"));

        if let Some(level) = &overrides.log_level {
            figment = figment.merge(Serialized::default("log.level", level));
        }
        if let Some(format) = overrides.log_format {
            figment = figment.merge(Serialized::default("log.format", format));
        }
        if let Some(store_path) = &overrides.store_path {
            figment = figment.merge(Serialized::default("store.path", store_path));
        }
        figment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use locksmith_jwt::SigningAlgorithm;
    use std::time::Duration;

    fn load_in_jail(overrides: &Overrides) -> figment::error::Result<AppConfig> {
        AppConfig::load(None, overrides).map_err(|e| format!("{e:#}").into())
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            let config = load_in_jail(&Overrides::default())?;
            assert_eq!(config, AppConfig::default());
            assert_eq!(config.store.kind, StoreKind::Local);
            assert_eq!(config.store.path, None);
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_then_flags() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                    [store]
                    path = "/var/lib/locksmith"

                    [policy]
                    rotation_interval = "24h"
                    grace_period = "48h"

                    [jwt]
                    algorithm = "HS512"

                    [log]
                    level = "debug"
                "#,
            )?;
            jail.set_env("LOCKSMITH_POLICY__GRACE_PERIOD", "72h");
            jail.set_env("LOCKSMITH_LOG", "trace");

            let overrides = Overrides {
                log_level: Some("warn".to_string()),
                ..Overrides::default()
            };
            let config = load_in_jail(&overrides)?;

            assert_eq!(config.store.path, Some(PathBuf::from("/var/lib/locksmith")));
            assert_eq!(config.policy.rotation_interval, Duration::from_secs(24 * 3600));
            assert_eq!(config.policy.grace_period, Duration::from_secs(72 * 3600));
            assert_eq!(config.jwt.algorithm, SigningAlgorithm::HS512);
            assert_eq!(config.log.level, "warn");
            Ok(())
        });
    }

    #[test]
    fn test_store_kind_from_env() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("LOCKSMITH_STORE__KIND", "memory");
            let config = load_in_jail(&Overrides::default())?;
            assert_eq!(config.store.kind, StoreKind::Memory);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        Jail::expect_with(|_| {
            let err = AppConfig::load(Some(Path::new("nope.toml")), &Overrides::default())
                .unwrap_err();
            assert!(err.to_string().contains("nope.toml"));
            Ok(())
        });
    }

    #[test]
    fn test_bad_duration_rejected() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("LOCKSMITH_POLICY__GRACE_PERIOD", "soon");
            assert!(AppConfig::load(None, &Overrides::default()).is_err());
            Ok(())
        });
    }
}
