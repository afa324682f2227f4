use basesync_core::engine::runner::{Reconciler, RunPolicy};
use basesync_core::report::console;
use std::sync::Arc;

use super::{build_api, exit_codes};
use crate::cli::args::TablesArgs;

pub async fn run(args: TablesArgs) -> anyhow::Result<i32> {
    let api = match build_api(&args.conn) {
        Ok(api) => api,
        Err(code) => return Ok(code),
    };

    let reconciler = Reconciler::new(Arc::new(api), RunPolicy::default());
    let tables = match reconciler.fetch_schema().await {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(exit_codes::FETCH_FAILED);
        }
    };

    if args.format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "tables": tables }))?
        );
    } else {
        console::print_tables(&tables);
    }
    Ok(exit_codes::OK)
}
