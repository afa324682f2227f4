use std::path::Path;
use std::time::Duration;

use basesync_core::config::api::ApiConfig;
use basesync_core::config::write_sample_schema;
use basesync_core::errors::ConfigError;
use basesync_core::providers::remote::http::HttpSchemaApi;

use crate::cli::args::{Cli, Command, ConnectionArgs, InitArgs};

pub mod run;
pub mod tables;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const TASK_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const FETCH_FAILED: i32 = 3;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Plan(args) => run::run(args, true).await,
        Command::Apply(args) => run::run(args, false).await,
        Command::Tables(args) => tables::run(args).await,
        Command::Init(args) => cmd_init(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

/// Connection settings from flags/env. Missing credentials are a config
/// error, reported before any request is made.
pub(crate) fn build_api(conn: &ConnectionArgs) -> Result<HttpSchemaApi, i32> {
    let cfg = ApiConfig::new(conn.base_id.clone(), conn.api_key.clone())
        .map(|c| {
            c.with_api_url(conn.api_url.clone())
                .with_timeout(Duration::from_secs(conn.timeout_secs))
        })
        .map_err(|e| config_error(&e))?;

    tracing::debug!(event = "basesync.api.config", config = ?cfg);

    HttpSchemaApi::new(cfg).map_err(|e| {
        eprintln!("error: failed to build HTTP client: {e}");
        exit_codes::CONFIG_ERROR
    })
}

pub(crate) fn config_error(e: &ConfigError) -> i32 {
    eprintln!("error: {e}");
    exit_codes::CONFIG_ERROR
}

fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    if write_file_if_missing(&args.schema)? {
        eprintln!("created {}", args.schema.display());
    } else {
        eprintln!("{} already exists; left untouched", args.schema.display());
    }
    Ok(exit_codes::OK)
}

fn write_file_if_missing(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    write_sample_schema(path)?;
    Ok(true)
}
