//! Ambient-first credential resolution.

use super::{CredentialBundle, CredentialSource, Session, DEFAULT_REGION};
use crate::error::CredentialError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Names of the environment variables holding ambient credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvVarNames {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

impl Default for EnvVarNames {
    fn default() -> Self {
        Self {
            access_key_id: "AWS_ACCESS_KEY_ID".to_string(),
            secret_access_key: "AWS_SECRET_ACCESS_KEY".to_string(),
            session_token: "AWS_SESSION_TOKEN".to_string(),
        }
    }
}

/// Builds sessions, preferring ambient credentials over an explicit fallback.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    region: String,
    env_vars: EnvVarNames,
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new(DEFAULT_REGION)
    }
}

impl CredentialResolver {
    /// Creates a resolver for the given region using the conventional variable names.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            env_vars: EnvVarNames::default(),
        }
    }

    /// Reads ambient credentials from different variable names.
    pub fn with_env_vars(mut self, env_vars: EnvVarNames) -> Self {
        self.env_vars = env_vars;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Resolves a session from the process environment.
    pub fn resolve_session(
        &self,
        fallback: Option<&CredentialBundle>,
    ) -> Result<Session, CredentialError> {
        self.resolve_with(fallback, |key| std::env::var(key).ok())
    }

    /// Resolves a session using `lookup` in place of the process environment.
    ///
    /// Ambient credentials win whenever both the key id and the secret are
    /// present; the fallback is not even inspected in that case.
    pub fn resolve_with<F>(
        &self,
        fallback: Option<&CredentialBundle>,
        lookup: F,
    ) -> Result<Session, CredentialError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let access_key_id = read(&self.env_vars.access_key_id);
        let secret_access_key = read(&self.env_vars.secret_access_key);
        let session_token = read(&self.env_vars.session_token);

        if let (Some(key), Some(secret)) = (&access_key_id, &secret_access_key) {
            info!(region = %self.region, "Using ambient credentials from environment");
            return Ok(Session::new(
                self.region.clone(),
                key,
                secret,
                session_token.as_deref(),
                CredentialSource::Environment,
            ));
        }

        debug!(
            access_key_present = access_key_id.is_some(),
            secret_present = secret_access_key.is_some(),
            "No usable ambient credentials"
        );

        let Some(bundle) = fallback else {
            return Err(CredentialError::exhausted());
        };

        if !bundle.is_complete() {
            return Err(CredentialError::new(
                "no usable credentials in environment and the fallback is missing its access key or secret",
            ));
        }

        info!(region = %self.region, "Using fallback credentials");
        Ok(Session::new(
            self.region.clone(),
            bundle.access_key_id(),
            bundle.secret_access_key(),
            bundle.session_token(),
            CredentialSource::Fallback,
        ))
    }
}

/// Resolves a session for `region` from the environment, falling back to `fallback`.
pub fn resolve_session(
    fallback: Option<&CredentialBundle>,
    region: &str,
) -> Result<Session, CredentialError> {
    CredentialResolver::new(region).resolve_session(fallback)
}
