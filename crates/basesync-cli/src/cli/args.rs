use basesync_core::config::api::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use basesync_core::engine::runner::DEFAULT_FIELD_DELAY_MS;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "basesync",
    version,
    about = "Additive schema reconciler for hosted spreadsheet-style bases"
)]
pub struct Cli {
    /// tracing filter, e.g. `info` or `basesync_core=debug`
    #[arg(long, global = true, env = "BASESYNC_LOG", default_value = "warn")]
    pub log_level: String,

    /// emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what would change without writing anything
    Plan(RunArgs),
    /// Create missing tables, fields and choices
    Apply(RunArgs),
    /// Print the remote schema
    Tables(TablesArgs),
    /// Write a sample desired-schema file
    Init(InitArgs),
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ConnectionArgs {
    #[arg(long, env = "BASESYNC_BASE_ID")]
    pub base_id: Option<String>,

    #[arg(long, env = "BASESYNC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "BASESYNC_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    #[arg(long, env = "BASESYNC_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, default_value = "basesync.yaml")]
    pub schema: PathBuf,

    /// warn about unknown keys in the schema file instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// pause between field creations (remote rate limit)
    #[arg(long, env = "BASESYNC_FIELD_DELAY_MS", default_value_t = DEFAULT_FIELD_DELAY_MS)]
    pub field_delay_ms: u64,

    /// skip the re-read of the table list right before creating a table
    #[arg(long)]
    pub no_recheck: bool,

    #[arg(long, default_value = "text")]
    pub format: String, // text|json

    /// also write the JSON run report here
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub conn: ConnectionArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct TablesArgs {
    #[arg(long, default_value = "text")]
    pub format: String, // text|json

    #[command(flatten)]
    pub conn: ConnectionArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "basesync.yaml")]
    pub schema: PathBuf,
}
