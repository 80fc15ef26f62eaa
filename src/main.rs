//! Athena Gateway - a read-only HTTP gateway over Amazon Athena.

use athena_gateway::auth::imds::ImdsClient;
use athena_gateway::auth::CredentialResolver;
use athena_gateway::cli::{Cli, Command};
use athena_gateway::config::Config;
use athena_gateway::error::{GatewayError, Result};
use athena_gateway::logging::init_stderr_logging;
use athena_gateway::query::QueryExecutor;
use athena_gateway::server::{self, AppState};
use serde::Serialize;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    init_stderr_logging(cli.log_format);

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Precedence: CLI flags, then environment, then config file, then defaults
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);

    match cli.command() {
        Command::InstanceCredentials => print_instance_credentials(&config).await,
        Command::Serve { .. } => {
            let executor = connect(&config)?;
            server::serve(config.server.bind, AppState::new(executor)).await
        }
        Command::Query { sql, catalog } => {
            let result = connect(&config)?.execute_query(&sql, &catalog).await?;
            info!(
                rows = result.len(),
                elapsed_ms = result.execution_time.as_millis() as u64,
                "Query finished"
            );
            print_json(&result.records)
        }
        Command::Databases => print_json(&connect(&config)?.list_databases().await?),
        Command::Tables { database } => {
            print_json(&connect(&config)?.list_tables(&database).await?)
        }
    }
}

/// Resolves a session and binds an Athena executor to it.
fn connect(config: &Config) -> Result<QueryExecutor> {
    config.athena.validate()?;

    let session = CredentialResolver::new(config.aws.region.clone())
        .with_env_vars(config.aws.env.clone())
        .resolve_session(config.aws.fallback.as_ref())?;
    info!(
        region = session.region(),
        source = %session.source(),
        workgroup = %config.athena.workgroup,
        "Session ready"
    );

    Ok(QueryExecutor::for_session(&session, &config.athena))
}

async fn print_instance_credentials(config: &Config) -> Result<()> {
    let client = ImdsClient::new(config.imds.base_url()?, config.imds.token_ttl_secs);
    let credentials = client
        .fetch_credentials()
        .await
        .map_err(|e| GatewayError::internal(format!("{e:#}")))?;
    print_json(&credentials)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| GatewayError::internal(format!("Failed to serialize output: {e}")))?;
    println!("{json}");
    Ok(())
}
