//! # idpscimcli
//!
//! Inspection CLI for both ends of the sync. Useful to check credentials and
//! to try out Directory filters before handing them to `idpscim`.
//!
//! ## Usage
//!
//! ```bash
//! # Groups matching a filter
//! idpscimcli gws groups list --gws-groups-filter 'name:AWS*'
//!
//! # Members of those groups, as YAML
//! idpscimcli gws groups members list -q 'name:AWS*' --output-format yaml
//!
//! # Users matching a filter
//! idpscimcli gws users list --gws-users-filter 'orgUnitPath=/Engineering'
//!
//! # What the SCIM endpoint currently holds
//! idpscimcli aws groups list
//! idpscimcli aws users list
//! idpscimcli aws service-provider-config
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Write;

use idp_scim_sync::config::{Config, ConfigArgs};
use idp_scim_sync::observability::init_logging;
use idp_scim_sync::provider::aws::{AwsScimClient, AwsScimProvider};
use idp_scim_sync::provider::google::{DirectoryClient, GoogleWorkspaceProvider};
use idp_scim_sync::provider::{IdentityProviderService, ScimService};

/// Check your AWS SSO (SCIM) and Google Workspace groups and users
#[derive(Debug, Parser)]
#[command(name = "idpscimcli", version, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    output_format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Google Workspace Directory
    Gws {
        #[command(subcommand)]
        command: GwsCommands,
    },
    /// AWS SSO SCIM endpoint
    Aws {
        #[command(subcommand)]
        command: AwsCommands,
    },
}

#[derive(Debug, Subcommand)]
enum GwsCommands {
    /// Groups
    Groups {
        #[command(subcommand)]
        command: GwsGroupsCommands,
    },
    /// Users
    Users {
        #[command(subcommand)]
        command: ListCommand,
    },
}

#[derive(Debug, Subcommand)]
enum GwsGroupsCommands {
    /// List groups matching --gws-groups-filter
    List,
    /// Group members
    Members {
        #[command(subcommand)]
        command: ListCommand,
    },
}

#[derive(Debug, Subcommand)]
enum AwsCommands {
    /// Groups
    Groups {
        #[command(subcommand)]
        command: ListCommand,
    },
    /// Users
    Users {
        #[command(subcommand)]
        command: ListCommand,
    },
    /// Show the SCIM service provider configuration
    ServiceProviderConfig,
}

#[derive(Debug, Subcommand)]
enum ListCommand {
    /// List them
    List,
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
    let config = Config::load(&cli.config)?;
    init_logging(&config.log_level, config.log_format)?;

    match cli.command {
        Commands::Gws { command } => {
            config.require_gws()?;
            let provider = gws_provider(&config)?;
            match command {
                GwsCommands::Groups {
                    command: GwsGroupsCommands::List,
                } => {
                    let groups = provider.get_groups(&config.gws_groups_filter).await?;
                    print(&groups, cli.output_format)
                }
                GwsCommands::Groups {
                    command: GwsGroupsCommands::Members { .. },
                } => {
                    let groups = provider.get_groups(&config.gws_groups_filter).await?;
                    let members = provider.get_groups_members(&groups).await?;
                    print(&members, cli.output_format)
                }
                GwsCommands::Users { .. } => {
                    let users = provider.get_users(&config.gws_users_filter).await?;
                    print(&users, cli.output_format)
                }
            }
        }
        Commands::Aws { command } => {
            config.require_aws()?;
            let provider = aws_provider(&config)?;
            match command {
                AwsCommands::Groups { .. } => {
                    let groups = provider.get_groups().await?;
                    print(&groups, cli.output_format)
                }
                AwsCommands::Users { .. } => {
                    let users = provider.get_users().await?;
                    print(&users, cli.output_format)
                }
                AwsCommands::ServiceProviderConfig => {
                    let spc = provider
                        .client()
                        .service_provider_config()
                        .await
                        .context("Failed to get the SCIM service provider configuration")?;
                    print(&spc, cli.output_format)
                }
            }
        }
    }
}

fn gws_provider(config: &Config) -> Result<GoogleWorkspaceProvider> {
    let client = DirectoryClient::new(
        &config.gws_api_url,
        config.gws_access_token.clone(),
        config.http_timeout(),
    )?
    .with_customer(config.gws_customer_id.clone());
    Ok(GoogleWorkspaceProvider::new(client))
}

fn aws_provider(config: &Config) -> Result<AwsScimProvider> {
    let client = AwsScimClient::new(
        &config.aws_scim_endpoint,
        config.aws_scim_access_token.clone(),
        config.http_timeout(),
        config.retry_policy(),
    )
    .context("Failed to create AWS SSO SCIM client")?;
    Ok(AwsScimProvider::new(client))
}

fn print<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to render JSON output")?
        }
        OutputFormat::Yaml => serde_yaml::to_string(value).context("Failed to render YAML output")?,
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", rendered.trim_end()).context("Failed to write output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_nested_list_command() {
        let cli = Cli::try_parse_from([
            "idpscimcli",
            "gws",
            "groups",
            "members",
            "list",
            "-q",
            "name:AWS*",
            "--output-format",
            "yaml",
        ])
        .unwrap();

        assert_eq!(cli.output_format, OutputFormat::Yaml);
        assert_eq!(cli.config.gws_groups_filter, vec!["name:AWS*"]);
        assert!(matches!(
            cli.command,
            Commands::Gws {
                command: GwsCommands::Groups {
                    command: GwsGroupsCommands::Members { .. }
                }
            }
        ));
    }

    #[test]
    fn test_parses_service_provider_config() {
        let cli =
            Cli::try_parse_from(["idpscimcli", "aws", "service-provider-config"]).unwrap();

        assert_eq!(cli.output_format, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Aws {
                command: AwsCommands::ServiceProviderConfig
            }
        ));
    }
}
