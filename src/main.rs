//! # idpscim
//!
//! Sync runner: keeps AWS SSO groups, users and memberships in line with
//! Google Workspace.
//!
//! ## Usage
//!
//! ```bash
//! # One cycle, then exit
//! idpscim --run-once --gws-groups-filter 'name:AWS*'
//!
//! # Every 10 minutes, with metrics on :5000
//! idpscim --sync-interval-secs 600 --metrics-port 5000
//!
//! # Show the plan only
//! idpscim --run-once --dry-run
//! ```
//!
//! Tokens and endpoints are usually provided through `IDPSCIM_*` environment
//! variables or a `.idpscim.yaml` file.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use idp_scim_sync::config::{Config, ConfigArgs, SyncArgs};
use idp_scim_sync::observability::{init_logging, metrics};
use idp_scim_sync::provider::aws::{AwsScimClient, AwsScimProvider};
use idp_scim_sync::provider::google::{DirectoryClient, GoogleWorkspaceProvider};
use idp_scim_sync::server::{start_server, wait_for_server_ready, ServerState};
use idp_scim_sync::state::FileStateRepository;
use idp_scim_sync::sync::{SyncOptions, SyncOutcome, SyncService};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_HASH"),
    ", built ",
    env!("BUILD_DATETIME"),
    ")"
);

/// Keep AWS SSO (SCIM) in sync with Google Workspace
#[derive(Debug, Parser)]
#[command(name = "idpscim", version = VERSION, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    sync: SyncArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    config.apply_sync_args(&cli.sync);

    init_logging(&config.log_level, config.log_format)?;
    info!(version = VERSION, "Starting idpscim");

    config.validate_for_sync()?;
    metrics::register_metrics()?;

    if let Some(port) = config.metrics_port {
        let server_state = Arc::new(ServerState::default());
        let state = Arc::clone(&server_state);
        let handle = tokio::spawn(async move {
            if let Err(e) = start_server(port, state).await {
                error!("HTTP server error: {e:#}");
            }
        });
        wait_for_server_ready(
            &server_state,
            &handle,
            config.server_startup_timeout(),
            config.server_poll_interval(),
        )
        .await?;
    }

    let service = build_service(&config)?;

    if config.run_once {
        let outcome = service.sync_groups_and_users().await?;
        log_outcome(&outcome);
        return Ok(());
    }

    info!(
        interval_secs = config.sync_interval_secs,
        "Running sync on a fixed interval"
    );
    let mut interval = tokio::time::interval(config.sync_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                // failures are logged and counted by the service; the next tick retries
                if let Ok(outcome) = service.sync_groups_and_users().await {
                    log_outcome(&outcome);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Failed to listen for shutdown signal: {e}");
                }
                info!("Shutdown requested, stopping");
                return Ok(());
            }
        }
    }
}

fn build_service(config: &Config) -> Result<SyncService> {
    let directory = DirectoryClient::new(
        &config.gws_api_url,
        config.gws_access_token.clone(),
        config.http_timeout(),
    )?
    .with_customer(config.gws_customer_id.clone());

    let scim = AwsScimClient::new(
        &config.aws_scim_endpoint,
        config.aws_scim_access_token.clone(),
        config.http_timeout(),
        config.retry_policy(),
    )
    .context("Failed to create AWS SSO SCIM client")?;

    Ok(SyncService::new(
        Arc::new(GoogleWorkspaceProvider::new(directory)),
        Arc::new(AwsScimProvider::new(scim)),
        Arc::new(FileStateRepository::new(config.state_path.clone())),
        SyncOptions {
            groups_filter: config.gws_groups_filter.clone(),
            dry_run: config.dry_run,
        },
    ))
}

fn log_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Unchanged => info!("No changes"),
        SyncOutcome::Planned(report) | SyncOutcome::Applied(report) => info!(
            groups_created = report.groups.create,
            groups_updated = report.groups.update,
            groups_deleted = report.groups.delete,
            users_created = report.users.create,
            users_updated = report.users.update,
            users_deleted = report.users.delete,
            members_added = report.members.create,
            members_removed = report.members.delete,
            applied = matches!(outcome, SyncOutcome::Applied(_)),
            "Sync finished"
        ),
    }
}
