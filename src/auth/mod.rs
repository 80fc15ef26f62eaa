//! AWS session construction.
//!
//! Resolves a [`Session`] from ambient environment credentials, falling back
//! to an explicit [`CredentialBundle`] when the environment has none.

pub mod imds;
mod resolver;
mod session;

pub use resolver::{resolve_session, CredentialResolver, EnvVarNames};
pub use session::{CredentialBundle, CredentialSource, Session};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";
