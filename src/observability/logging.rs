//! # Logging
//!
//! `tracing` subscriber setup for both binaries.
//!
//! `RUST_LOG` wins when set; otherwise the configured level applies to this
//! crate's targets and everything else logs at `warn`.

use anyhow::Result;
use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;
use tracing_subscriber::EnvFilter;

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human readable
    #[default]
    Text,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => f.write_str("json"),
            LogFormat::Text => f.write_str("text"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" => Ok(LogFormat::Text),
            other => Err(anyhow::anyhow!("unknown log format {other:?}, expected json or text")),
        }
    }
}

/// Filter directives for a level applied to this crate and its binaries
pub fn filter_directive(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    format!("warn,idp_scim_sync={level},idpscim={level},idpscimcli={level}")
}

/// Install the global subscriber
///
/// # Errors
/// Fails when the level is not a valid filter or a subscriber is already set
pub fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directive(level))
            .map_err(|e| anyhow::anyhow!("Invalid log level {level:?}: {e}"))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(
            filter_directive("DEBUG"),
            "warn,idp_scim_sync=debug,idpscim=debug,idpscimcli=debug"
        );
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_format_from_yaml() {
        let format: LogFormat = serde_yaml::from_str("json").unwrap();
        assert_eq!(format, LogFormat::Json);
    }
}
