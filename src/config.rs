//! Configuration management for the gateway.
//!
//! Handles loading configuration from TOML files and environment variables,
//! covering the AWS session, the Athena workgroup and the HTTP listener.

use crate::auth::{CredentialBundle, EnvVarNames, DEFAULT_REGION};
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// AWS session settings.
    #[serde(default)]
    pub aws: AwsConfig,

    /// Athena query service settings.
    #[serde(default)]
    pub athena: AthenaConfig,

    /// Instance metadata service settings.
    #[serde(default)]
    pub imds: ImdsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind, e.g. "0.0.0.0:8000".
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// AWS session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Region the session is bound to.
    #[serde(default = "default_region")]
    pub region: String,

    /// Names of the ambient credential variables.
    #[serde(default)]
    pub env: EnvVarNames,

    /// Explicit credentials used when the environment has none.
    #[serde(skip_serializing)]
    pub fallback: Option<CredentialBundle>,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            env: EnvVarNames::default(),
            fallback: None,
        }
    }
}

/// Athena query service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthenaConfig {
    /// Workgroup queries run in.
    #[serde(default = "default_workgroup")]
    pub workgroup: String,

    /// Data catalog holding the Glue databases.
    #[serde(default = "default_data_catalog")]
    pub data_catalog: String,

    /// S3 location for results, when the workgroup does not enforce one.
    pub output_location: Option<String>,

    /// Delay between execution status checks, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Rows requested per `GetQueryResults` page (Athena caps this at 1000).
    #[serde(default = "default_page_size")]
    pub page_size: i32,

    /// Endpoint override, for Athena-compatible test doubles.
    pub endpoint_url: Option<String>,
}

fn default_workgroup() -> String {
    "AmazonAthenaLakeFormation".to_string()
}

fn default_data_catalog() -> String {
    "AwsDataCatalog".to_string()
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_page_size() -> i32 {
    1000
}

impl Default for AthenaConfig {
    fn default() -> Self {
        Self {
            workgroup: default_workgroup(),
            data_catalog: default_data_catalog(),
            output_location: None,
            poll_interval_ms: default_poll_interval_ms(),
            page_size: default_page_size(),
            endpoint_url: None,
        }
    }
}

impl AthenaConfig {
    /// Returns the status poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Checks values the service would otherwise reject at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.workgroup.trim().is_empty() {
            return Err(GatewayError::config("athena.workgroup must not be empty"));
        }
        if self.data_catalog.trim().is_empty() {
            return Err(GatewayError::config("athena.data_catalog must not be empty"));
        }
        if !(1..=1000).contains(&self.page_size) {
            return Err(GatewayError::config(format!(
                "athena.page_size must be between 1 and 1000, got {}",
                self.page_size
            )));
        }
        if let Some(location) = &self.output_location {
            if !location.starts_with("s3://") {
                return Err(GatewayError::config(format!(
                    "athena.output_location must be an s3:// URI, got '{location}'"
                )));
            }
        }
        if let Some(endpoint) = &self.endpoint_url {
            Url::parse(endpoint).map_err(|e| {
                GatewayError::config(format!("Invalid athena.endpoint_url '{endpoint}': {e}"))
            })?;
        }
        Ok(())
    }
}

/// Instance metadata service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImdsConfig {
    /// Base URL of the metadata service.
    #[serde(default = "default_imds_base_url")]
    pub base_url: String,

    /// Session token lifetime requested from the service, in seconds.
    #[serde(default = "default_imds_token_ttl")]
    pub token_ttl_secs: u32,
}

fn default_imds_base_url() -> String {
    "http://169.254.169.254".to_string()
}

fn default_imds_token_ttl() -> u32 {
    21600
}

impl Default for ImdsConfig {
    fn default() -> Self {
        Self {
            base_url: default_imds_base_url(),
            token_ttl_secs: default_imds_token_ttl(),
        }
    }
}

impl ImdsConfig {
    /// Parses the configured base URL.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| {
            GatewayError::config(format!("Invalid imds.base_url '{}': {e}", self.base_url))
        })
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("athena-gateway")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            GatewayError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies environment variables (AWS_REGION, ATHENA_WORKGROUP, etc.) over file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// A set, non-blank variable always replaces the file value.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let region = non_empty("AWS_REGION").or_else(|| non_empty("AWS_DEFAULT_REGION"));
        if let Some(region) = region {
            self.aws.region = region;
        }
        if let Some(workgroup) = non_empty("ATHENA_WORKGROUP") {
            self.athena.workgroup = workgroup;
        }
        if let Some(location) = non_empty("ATHENA_OUTPUT_LOCATION") {
            self.athena.output_location = Some(location);
        }
    }
}
