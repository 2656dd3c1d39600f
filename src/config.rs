//! # Configuration
//!
//! Settings shared by `idpscim` and `idpscimcli`.
//!
//! Sources, lowest precedence first:
//!
//! 1. Defaults from [`crate::constants`]
//! 2. YAML config file (`--config-file`, default `.idpscim.yaml` if present)
//! 3. `IDPSCIM_*` environment variables
//! 4. Command line flags
//!
//! Environment variables and flags are both parsed by clap, which already
//! prefers a flag over its variable, and are applied on top of the file.
//!
//! ```yaml
//! gws_access_token: ya29....
//! gws_groups_filter:
//!   - 'name:AWS*'
//! aws_scim_endpoint: https://scim.us-east-1.amazonaws.com/xxxx/scim/v2
//! aws_scim_access_token: xxxx
//! sync_interval_secs: 600
//! log_format: json
//! ```

use clap::Args;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::backoff::FibonacciBackoff;
use crate::constants;
use crate::observability::LogFormat;
use crate::provider::aws::RetryPolicy;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = ".idpscim.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("missing required setting {0} (flag --{flag} or {prefix}{env})", flag = .0.replace('_', "-"), prefix = constants::ENV_PREFIX, env = .0.to_uppercase())]
    Missing(&'static str),

    #[error("sync interval {actual}s is below the minimum of {minimum}s")]
    SyncIntervalTooShort { actual: u64, minimum: u64 },
}

/// Resolved configuration
#[derive(Clone)]
pub struct Config {
    pub gws_api_url: String,
    pub gws_customer_id: String,
    pub gws_access_token: Zeroizing<String>,
    pub gws_groups_filter: Vec<String>,
    pub gws_users_filter: Vec<String>,
    pub aws_scim_endpoint: String,
    pub aws_scim_access_token: Zeroizing<String>,
    pub state_path: PathBuf,
    pub sync_interval_secs: u64,
    pub run_once: bool,
    pub dry_run: bool,
    pub max_retries: u32,
    pub backoff_start_ms: u64,
    pub backoff_max_ms: u64,
    pub http_timeout_secs: u64,
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_port: Option<u16>,
    pub server_startup_timeout_secs: u64,
    pub server_poll_interval_ms: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("gws_api_url", &self.gws_api_url)
            .field("gws_customer_id", &self.gws_customer_id)
            .field("gws_groups_filter", &self.gws_groups_filter)
            .field("gws_users_filter", &self.gws_users_filter)
            .field("aws_scim_endpoint", &self.aws_scim_endpoint)
            .field("state_path", &self.state_path)
            .field("sync_interval_secs", &self.sync_interval_secs)
            .field("run_once", &self.run_once)
            .field("dry_run", &self.dry_run)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("metrics_port", &self.metrics_port)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            gws_api_url: DEFAULT_GWS_API_URL.to_string(),
            gws_customer_id: crate::provider::google::MY_CUSTOMER.to_string(),
            gws_access_token: Zeroizing::new(String::new()),
            gws_groups_filter: Vec::new(),
            gws_users_filter: Vec::new(),
            aws_scim_endpoint: String::new(),
            aws_scim_access_token: Zeroizing::new(String::new()),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            run_once: false,
            dry_run: false,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::default(),
            metrics_port: None,
            server_startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            server_poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
        }
    }
}

/// Shape of the YAML config file; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub gws_api_url: Option<String>,
    pub gws_customer_id: Option<String>,
    pub gws_access_token: Option<String>,
    pub gws_groups_filter: Option<Vec<String>>,
    pub gws_users_filter: Option<Vec<String>>,
    pub aws_scim_endpoint: Option<String>,
    pub aws_scim_access_token: Option<String>,
    pub state_path: Option<PathBuf>,
    pub sync_interval_secs: Option<u64>,
    pub run_once: Option<bool>,
    pub dry_run: Option<bool>,
    pub max_retries: Option<u32>,
    pub backoff_start_ms: Option<u64>,
    pub backoff_max_ms: Option<u64>,
    pub http_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub metrics_port: Option<u16>,
}

/// Flags and `IDPSCIM_*` variables shared by both binaries
#[derive(Debug, Default, Clone, Args)]
pub struct ConfigArgs {
    /// YAML configuration file
    #[arg(short = 'c', long, env = "IDPSCIM_CONFIG_FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Enable debug logging (overrides --log-level)
    #[arg(short = 'd', long, env = "IDPSCIM_DEBUG", global = true)]
    pub debug: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, env = "IDPSCIM_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format
    #[arg(short = 'f', long, value_enum, env = "IDPSCIM_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Google Directory API base URL
    #[arg(long, env = "IDPSCIM_GWS_API_URL", global = true)]
    pub gws_api_url: Option<String>,

    /// Google Workspace customer id
    #[arg(long, env = "IDPSCIM_GWS_CUSTOMER_ID", global = true)]
    pub gws_customer_id: Option<String>,

    /// Google Workspace OAuth2 access token
    #[arg(long, env = "IDPSCIM_GWS_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub gws_access_token: Option<String>,

    /// Directory query selecting the groups to sync (repeatable)
    #[arg(short = 'q', long, env = "IDPSCIM_GWS_GROUPS_FILTER", value_delimiter = ',', global = true)]
    pub gws_groups_filter: Vec<String>,

    /// Directory query selecting users for the CLI listing (repeatable)
    #[arg(short = 'r', long, env = "IDPSCIM_GWS_USERS_FILTER", value_delimiter = ',', global = true)]
    pub gws_users_filter: Vec<String>,

    /// AWS SSO SCIM endpoint
    #[arg(long, env = "IDPSCIM_AWS_SCIM_ENDPOINT", global = true)]
    pub aws_scim_endpoint: Option<String>,

    /// AWS SSO SCIM access token
    #[arg(long, env = "IDPSCIM_AWS_SCIM_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub aws_scim_access_token: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, env = "IDPSCIM_HTTP_TIMEOUT_SECS", global = true)]
    pub http_timeout_secs: Option<u64>,

    /// Retries for throttled or failed SCIM calls
    #[arg(long, env = "IDPSCIM_MAX_RETRIES", global = true)]
    pub max_retries: Option<u32>,
}

/// Flags and `IDPSCIM_*` variables of the sync runner only
#[derive(Debug, Default, Clone, Args)]
pub struct SyncArgs {
    /// Path of the state file
    #[arg(short = 's', long, env = "IDPSCIM_STATE_PATH")]
    pub state_path: Option<PathBuf>,

    /// Seconds between two sync cycles
    #[arg(short = 'i', long, env = "IDPSCIM_SYNC_INTERVAL_SECS")]
    pub sync_interval_secs: Option<u64>,

    /// Run a single sync cycle and exit
    #[arg(long, env = "IDPSCIM_RUN_ONCE")]
    pub run_once: bool,

    /// Compute and log the plan without provisioning anything
    #[arg(long, env = "IDPSCIM_DRY_RUN")]
    pub dry_run: bool,

    /// Serve /metrics, /healthz and /readyz on this port
    #[arg(long, env = "IDPSCIM_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

impl Config {
    /// Defaults, then the config file, then flags and environment
    pub fn load(args: &ConfigArgs) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let (path, explicit) = match &args.config_file {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if explicit || path.exists() {
            config.apply_file(read_config_file(&path)?);
        }

        config.apply_args(args);
        Ok(config)
    }

    pub fn apply_file(&mut self, file: ConfigFile) {
        set(&mut self.gws_api_url, file.gws_api_url);
        set(&mut self.gws_customer_id, file.gws_customer_id);
        set_secret(&mut self.gws_access_token, file.gws_access_token);
        set(&mut self.gws_groups_filter, file.gws_groups_filter);
        set(&mut self.gws_users_filter, file.gws_users_filter);
        set(&mut self.aws_scim_endpoint, file.aws_scim_endpoint);
        set_secret(&mut self.aws_scim_access_token, file.aws_scim_access_token);
        set(&mut self.state_path, file.state_path);
        set(&mut self.sync_interval_secs, file.sync_interval_secs);
        set(&mut self.run_once, file.run_once);
        set(&mut self.dry_run, file.dry_run);
        set(&mut self.max_retries, file.max_retries);
        set(&mut self.backoff_start_ms, file.backoff_start_ms);
        set(&mut self.backoff_max_ms, file.backoff_max_ms);
        set(&mut self.http_timeout_secs, file.http_timeout_secs);
        set(&mut self.log_level, file.log_level);
        set(&mut self.log_format, file.log_format);
        if file.metrics_port.is_some() {
            self.metrics_port = file.metrics_port;
        }
    }

    pub fn apply_args(&mut self, args: &ConfigArgs) {
        set(&mut self.log_level, args.log_level.clone());
        if args.debug {
            "debug".clone_into(&mut self.log_level);
        }
        set(&mut self.log_format, args.log_format);
        set(&mut self.gws_api_url, args.gws_api_url.clone());
        set(&mut self.gws_customer_id, args.gws_customer_id.clone());
        set_secret(&mut self.gws_access_token, args.gws_access_token.clone());
        if !args.gws_groups_filter.is_empty() {
            self.gws_groups_filter.clone_from(&args.gws_groups_filter);
        }
        if !args.gws_users_filter.is_empty() {
            self.gws_users_filter.clone_from(&args.gws_users_filter);
        }
        set(&mut self.aws_scim_endpoint, args.aws_scim_endpoint.clone());
        set_secret(&mut self.aws_scim_access_token, args.aws_scim_access_token.clone());
        set(&mut self.http_timeout_secs, args.http_timeout_secs);
        set(&mut self.max_retries, args.max_retries);
    }

    pub fn apply_sync_args(&mut self, args: &SyncArgs) {
        set(&mut self.state_path, args.state_path.clone());
        set(&mut self.sync_interval_secs, args.sync_interval_secs);
        self.run_once |= args.run_once;
        self.dry_run |= args.dry_run;
        if args.metrics_port.is_some() {
            self.metrics_port = args.metrics_port;
        }
    }

    /// Settings needed to read from Google Workspace
    pub fn require_gws(&self) -> Result<(), ConfigError> {
        if self.gws_access_token.is_empty() {
            return Err(ConfigError::Missing("gws_access_token"));
        }
        if self.gws_api_url.is_empty() {
            return Err(ConfigError::Missing("gws_api_url"));
        }
        Ok(())
    }

    /// Settings needed to talk to the SCIM endpoint
    pub fn require_aws(&self) -> Result<(), ConfigError> {
        if self.aws_scim_endpoint.is_empty() {
            return Err(ConfigError::Missing("aws_scim_endpoint"));
        }
        if self.aws_scim_access_token.is_empty() {
            return Err(ConfigError::Missing("aws_scim_access_token"));
        }
        Ok(())
    }

    /// Everything the sync runner needs
    pub fn validate_for_sync(&self) -> Result<(), ConfigError> {
        self.require_gws()?;
        self.require_aws()?;
        if !self.run_once && self.sync_interval_secs < constants::MIN_SYNC_INTERVAL_SECS {
            return Err(ConfigError::SyncIntervalTooShort {
                actual: self.sync_interval_secs,
                minimum: constants::MIN_SYNC_INTERVAL_SECS,
            });
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn server_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.server_startup_timeout_secs)
    }

    pub fn server_poll_interval(&self) -> Duration {
        Duration::from_millis(self.server_poll_interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: FibonacciBackoff::new(self.backoff_start_ms, self.backoff_max_ms),
        }
    }
}

/// Read and parse a YAML config file
pub fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_file(path, &content)
}

fn parse_config_file(path: &Path, content: &str) -> Result<ConfigFile, ConfigError> {
    if content.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(content).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_secret(target: &mut Zeroizing<String>, value: Option<String>) {
    if let Some(value) = value {
        *target = Zeroizing::new(value);
    }
}
