//! Logger configuration and presets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LogError;

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `EnvFilter` directive, e.g. `info` or `locksmith_rotation=debug,info`
    pub level: String,
    /// Output format
    pub format: Format,
    /// Output destination
    pub writer: WriterConfig,
    /// Which metadata to print
    pub display: DisplayConfig,
}

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Multi-line human-readable output
    Pretty,
    /// Single-line output
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

/// Output destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterConfig {
    /// Standard error
    #[default]
    Stderr,
    /// Standard output
    Stdout,
}

/// Display options shared by all formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct DisplayConfig {
    /// Print timestamps
    pub time: bool,
    /// Print file and line
    pub source: bool,
    /// Print the event target
    pub target: bool,
    /// Print thread ids
    pub thread_ids: bool,
    /// ANSI colors
    pub colors: bool,
    /// Flatten event fields into the top-level JSON object
    pub flatten: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Compact,
            writer: WriterConfig::Stderr,
            display: DisplayConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            time: true,
            source: false,
            target: true,
            thread_ids: false,
            colors: true,
            flatten: false,
        }
    }
}

impl Config {
    /// Configuration from `LOCKSMITH_LOG`/`RUST_LOG` and `LOCKSMITH_LOG_*`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup("LOCKSMITH_LOG").or_else(|| lookup("RUST_LOG")) {
            config.level = level;
        }

        // Unknown names fall back to compact
        if let Some(format) = lookup("LOCKSMITH_LOG_FORMAT") {
            config.format = format.parse().unwrap_or_default();
        }

        config.display.apply_env(&lookup);
        config
    }

    /// Debug level, pretty output with source locations
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: Format::Pretty,
            display: DisplayConfig {
                colors: true,
                source: true,
                ..DisplayConfig::default()
            },
            ..Self::default()
        }
    }

    /// Info level, flattened JSON without colors
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Json,
            display: DisplayConfig {
                colors: false,
                source: false,
                flatten: true,
                ..DisplayConfig::default()
            },
            ..Self::default()
        }
    }
}

impl DisplayConfig {
    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        let flag = |key: &str| lookup(key).map(|v| v != "0" && !v.eq_ignore_ascii_case("false"));

        if let Some(time) = flag("LOCKSMITH_LOG_TIME") {
            self.time = time;
        }
        if let Some(source) = flag("LOCKSMITH_LOG_SOURCE") {
            self.source = source;
        }
        if let Some(colors) = flag("LOCKSMITH_LOG_COLORS") {
            self.colors = colors;
        }
        if lookup("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            self.colors = false;
        }
    }
}

impl FromStr for Format {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(LogError::Format(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_empty_env_is_default() {
        assert_eq!(Config::from_lookup(env(&[])), Config::default());
    }

    #[test]
    fn test_locksmith_log_wins_over_rust_log() {
        let config = Config::from_lookup(env(&[
            ("LOCKSMITH_LOG", "locksmith_rotation=trace"),
            ("RUST_LOG", "warn"),
        ]));
        assert_eq!(config.level, "locksmith_rotation=trace");

        let config = Config::from_lookup(env(&[("RUST_LOG", "warn")]));
        assert_eq!(config.level, "warn");
    }

    #[rstest]
    #[case("json", Format::Json)]
    #[case("PRETTY", Format::Pretty)]
    #[case("compact", Format::Compact)]
    #[case("logfmt", Format::Compact)]
    fn test_format_from_env(#[case] raw: &str, #[case] expected: Format) {
        let config = Config::from_lookup(env(&[("LOCKSMITH_LOG_FORMAT", raw)]));
        assert_eq!(config.format, expected);
    }

    #[test]
    fn test_display_flags_from_env() {
        let config = Config::from_lookup(env(&[
            ("LOCKSMITH_LOG_TIME", "false"),
            ("LOCKSMITH_LOG_SOURCE", "1"),
            ("NO_COLOR", "1"),
        ]));
        assert!(!config.display.time);
        assert!(config.display.source);
        assert!(!config.display.colors);
    }

    #[test]
    fn test_presets() {
        let dev = Config::development();
        assert_eq!(dev.format, Format::Pretty);
        assert_eq!(dev.level, "debug");

        let prod = Config::production();
        assert_eq!(prod.format, Format::Json);
        assert!(prod.display.flatten);
        assert!(!prod.display.colors);
    }

    #[test]
    fn test_unknown_format_error() {
        assert!(matches!("xml".parse::<Format>(), Err(LogError::Format(f)) if f == "xml"));
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: Config = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(config.format, Format::Json);
        assert_eq!(config.level, "info");
        assert!(config.display.time);
    }
}
