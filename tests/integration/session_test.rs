//! Session resolution through configuration.

use athena_gateway::auth::{CredentialResolver, CredentialSource};
use athena_gateway::config::Config;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

fn load(toml: &str) -> Config {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    Config::load_from_file(file.path()).unwrap()
}

#[test]
fn test_fallback_from_config_file() {
    let config = load(
        r#"
[aws]
region = "us-east-2"

[aws.fallback]
access_key_id = "AKIAFROMFILE"
secret_access_key = "file-secret"
session_token = "file-token"
"#,
    );

    let session = CredentialResolver::new(config.aws.region.clone())
        .with_env_vars(config.aws.env.clone())
        .resolve_with(config.aws.fallback.as_ref(), lookup(&[]))
        .unwrap();

    assert_eq!(session.source(), CredentialSource::Fallback);
    assert_eq!(session.region(), "us-east-2");
    assert_eq!(session.access_key_id(), "AKIAFROMFILE");
    assert!(session.has_session_token());
}

#[test]
fn test_renamed_env_vars_from_config_file() {
    let config = load(
        r#"
[aws.env]
access_key_id = "IMS_KEY"
secret_access_key = "IMS_SECRET"
session_token = "IMS_TOKEN"

[aws.fallback]
access_key_id = "AKIAFROMFILE"
secret_access_key = "file-secret"
"#,
    );

    let session = CredentialResolver::new(config.aws.region.clone())
        .with_env_vars(config.aws.env.clone())
        .resolve_with(
            config.aws.fallback.as_ref(),
            lookup(&[("IMS_KEY", "AKIAAMBIENT"), ("IMS_SECRET", "ambient-secret")]),
        )
        .unwrap();

    assert_eq!(session.source(), CredentialSource::Environment);
    assert_eq!(session.access_key_id(), "AKIAAMBIENT");
    assert!(!session.has_session_token());
}

#[test]
fn test_no_credentials_anywhere() {
    let config = load("");

    let err = CredentialResolver::new(config.aws.region.clone())
        .resolve_with(config.aws.fallback.as_ref(), lookup(&[]))
        .unwrap_err();

    assert_eq!(
        err.message(),
        "no usable credentials in environment and no fallback provided"
    );
}
