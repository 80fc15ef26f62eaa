//! Credential bundle and authenticated session types.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use serde::Deserialize;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Provider name attached to credentials built by this crate.
const PROVIDER_NAME: &str = "athena-gateway";

/// Explicit credentials supplied by the caller as a fallback.
#[derive(Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CredentialBundle {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    session_token: Option<String>,
}

impl CredentialBundle {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// True when both the key id and the secret are non-blank.
    pub fn is_complete(&self) -> bool {
        !self.access_key_id.trim().is_empty() && !self.secret_access_key.trim().is_empty()
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "** redacted **"),
            )
            .finish()
    }
}

/// Where a session's credentials came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Ambient environment variables.
    Environment,
    /// The caller-supplied fallback bundle.
    Fallback,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => write!(f, "environment"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// An authenticated context bound to a region.
///
/// Immutable once built: changing credentials means building a new session.
/// Cheap to clone and safe to share across concurrent queries.
#[derive(Debug, Clone)]
pub struct Session {
    region: String,
    credentials: Credentials,
    source: CredentialSource,
}

impl Session {
    pub(crate) fn new(
        region: impl Into<String>,
        access_key_id: &str,
        secret_access_key: &str,
        session_token: Option<&str>,
        source: CredentialSource,
    ) -> Self {
        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            session_token.map(str::to_string),
            None,
            PROVIDER_NAME,
        );
        Self {
            region: region.into(),
            credentials,
            source,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn access_key_id(&self) -> &str {
        self.credentials.access_key_id()
    }

    pub fn has_session_token(&self) -> bool {
        self.credentials.session_token().is_some()
    }

    /// Builds an SDK configuration that signs with this session's credentials.
    ///
    /// Nothing is loaded from the environment or the network here.
    pub fn sdk_config(&self) -> SdkConfig {
        SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(SharedCredentialsProvider::new(self.credentials.clone()))
            .build()
    }
}
