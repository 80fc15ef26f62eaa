//! Command-line argument parsing.

use crate::auth::CredentialBundle;
use crate::config::Config;
use crate::logging::LogFormat;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Read-only HTTP gateway over Amazon Athena.
#[derive(Parser, Debug)]
#[command(name = "athena-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// AWS region for the session
    #[arg(long, global = true, value_name = "REGION")]
    pub region: Option<String>,

    /// Athena workgroup queries run in
    #[arg(long, global = true, value_name = "NAME")]
    pub workgroup: Option<String>,

    /// Log output format (text or json)
    #[arg(long, global = true, value_name = "FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Access key id used when the environment has no credentials
    #[arg(
        long,
        global = true,
        env = "ATHENA_GATEWAY_FALLBACK_ACCESS_KEY_ID",
        hide_env_values = true
    )]
    pub fallback_access_key_id: Option<String>,

    /// Secret access key used when the environment has no credentials
    #[arg(
        long,
        global = true,
        env = "ATHENA_GATEWAY_FALLBACK_SECRET_ACCESS_KEY",
        hide_env_values = true
    )]
    pub fallback_secret_access_key: Option<String>,

    /// Session token used when the environment has no credentials
    #[arg(
        long,
        global = true,
        env = "ATHENA_GATEWAY_FALLBACK_SESSION_TOKEN",
        hide_env_values = true
    )]
    pub fallback_session_token: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve {
        /// Address to listen on
        #[arg(long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },

    /// Run one SQL query and print the records as JSON
    Query {
        /// SQL text, sent as-is
        sql: String,

        /// Catalog database the query runs against
        #[arg(short, long, value_name = "DATABASE")]
        catalog: String,
    },

    /// List databases in the data catalog
    Databases,

    /// List tables in a catalog database
    Tables {
        /// Catalog database name
        database: String,
    },

    /// Fetch the attached role's credentials from instance metadata
    InstanceCredentials,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the subcommand, defaulting to `serve`.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve { bind: None })
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Builds a fallback bundle from the fallback flags, if any were given.
    pub fn fallback_bundle(&self) -> Option<CredentialBundle> {
        if self.fallback_access_key_id.is_none() && self.fallback_secret_access_key.is_none() {
            return None;
        }
        Some(CredentialBundle::new(
            self.fallback_access_key_id.clone().unwrap_or_default(),
            self.fallback_secret_access_key.clone().unwrap_or_default(),
            self.fallback_session_token.clone(),
        ))
    }

    /// Applies CLI overrides on top of file and environment configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(region) = &self.region {
            config.aws.region = region.clone();
        }
        if let Some(workgroup) = &self.workgroup {
            config.athena.workgroup = workgroup.clone();
        }
        if let Some(bundle) = self.fallback_bundle() {
            config.aws.fallback = Some(bundle);
        }
        if let Some(Command::Serve { bind: Some(bind) }) = &self.command {
            config.server.bind = *bind;
        }
    }
}
