//! # Constants
//!
//! Shared defaults used throughout the sync runner and the CLI.
//!
//! These values represent reasonable defaults and can be overridden via the
//! config file, `IDPSCIM_*` environment variables or command line flags.

/// Prefix of every environment variable read by [`crate::config::Config`]
pub const ENV_PREFIX: &str = "IDPSCIM_";

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default interval between two sync cycles when running continuously (seconds)
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Minimum sync interval (seconds)
/// Shorter intervals hit the Directory API quota
pub const MIN_SYNC_INTERVAL_SECS: u64 = 60;

/// Default Fibonacci backoff starting value for SCIM retries (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 500;

/// Default Fibonacci backoff maximum value for SCIM retries (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 10_000;

/// Default number of retries for throttled or failed SCIM calls
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Default HTTP request timeout (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default location of the persisted state file
pub const DEFAULT_STATE_PATH: &str = "state.json";

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Google Directory API base URL
pub const DEFAULT_GWS_API_URL: &str = "https://admin.googleapis.com/admin/directory/v1";

/// Page size requested from the Directory API (its maximum for groups and members)
pub const GWS_PAGE_SIZE: u32 = 200;

/// Directory requests in flight while expanding groups and members
pub const GWS_CONCURRENCY: usize = 4;

/// Page size requested from the SCIM list endpoints
pub const SCIM_PAGE_SIZE: u32 = 100;

/// Version of the persisted state layout
pub const STATE_SCHEMA_VERSION: &str = "1.0.0";

/// User agent sent on every HTTP request
pub const USER_AGENT: &str = concat!("idp-scim-sync/", env!("CARGO_PKG_VERSION"));
