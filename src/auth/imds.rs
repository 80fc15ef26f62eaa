//! EC2 instance metadata (IMDSv2) credential retrieval.
//!
//! Used by the `instance-credentials` subcommand to print the instance role's
//! temporary credentials, which can then be supplied as a fallback bundle.
//! Session resolution itself never calls this.

use super::CredentialBundle;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use url::Url;

const TOKEN_PATH: &str = "latest/api/token";
const CREDENTIALS_PATH: &str = "latest/meta-data/iam/security-credentials/";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// Temporary credentials published for the instance role.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceCredentials {
    pub code: Option<String>,
    pub last_updated: Option<String>,
    #[serde(rename = "Type")]
    pub credential_type: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub token: Option<String>,
    pub expiration: Option<String>,
}

impl InstanceCredentials {
    /// Converts into a bundle suitable as a session fallback.
    pub fn to_bundle(&self) -> CredentialBundle {
        CredentialBundle::new(
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            self.token.clone(),
        )
    }
}

impl fmt::Debug for InstanceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCredentials")
            .field("code", &self.code)
            .field("last_updated", &self.last_updated)
            .field("credential_type", &self.credential_type)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("token", &self.token.as_ref().map(|_| "** redacted **"))
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Client for the instance metadata service.
#[derive(Debug, Clone)]
pub struct ImdsClient {
    http: reqwest::Client,
    base_url: Url,
    token_ttl_secs: u32,
}

impl ImdsClient {
    pub fn new(base_url: Url, token_ttl_secs: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            token_ttl_secs,
        }
    }

    fn endpoint(&self, path: &str) -> anyhow::Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("invalid metadata path '{path}'"))
    }

    /// Requests a session token for subsequent metadata calls.
    pub async fn fetch_token(&self) -> anyhow::Result<String> {
        let response = self
            .http
            .put(self.endpoint(TOKEN_PATH)?)
            .header(TOKEN_TTL_HEADER, self.token_ttl_secs.to_string())
            .send()
            .await
            .context("failed to request metadata token")?
            .error_for_status()
            .context("metadata token request was rejected")?;

        response
            .text()
            .await
            .context("failed to read metadata token")
    }

    /// Returns the name of the role attached to the instance.
    pub async fn fetch_role_name(&self, token: &str) -> anyhow::Result<String> {
        let body = self
            .http
            .get(self.endpoint(CREDENTIALS_PATH)?)
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .context("failed to list instance roles")?
            .error_for_status()
            .context("instance role listing was rejected")?
            .text()
            .await
            .context("failed to read instance role listing")?;

        match body.lines().map(str::trim).find(|l| !l.is_empty()) {
            Some(role) => Ok(role.to_string()),
            None => bail!("no IAM role is attached to this instance"),
        }
    }

    /// Fetches the role's temporary credentials.
    pub async fn fetch_credentials(&self) -> anyhow::Result<InstanceCredentials> {
        let token = self.fetch_token().await?;
        let role = self.fetch_role_name(&token).await?;
        debug!(%role, "Fetching instance role credentials");

        let url = self.endpoint(&format!("{CREDENTIALS_PATH}{role}"))?;
        self.http
            .get(url)
            .header(TOKEN_HEADER, &token)
            .send()
            .await
            .with_context(|| format!("failed to fetch credentials for role '{role}'"))?
            .error_for_status()
            .with_context(|| format!("credential request for role '{role}' was rejected"))?
            .json::<InstanceCredentials>()
            .await
            .context("failed to parse instance credentials")
    }
}
