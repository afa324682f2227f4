use std::sync::Arc;
use std::time::Duration;

use basesync_core::config::load_schema;
use basesync_core::engine::runner::{Reconciler, RunPolicy};
use basesync_core::report::{console, json};

use super::{build_api, config_error, exit_codes};
use crate::cli::args::RunArgs;

pub async fn run(args: RunArgs, dry_run: bool) -> anyhow::Result<i32> {
    // 1. Desired schema (fail before touching the network)
    let desired = match load_schema(&args.schema, !args.lenient) {
        Ok(s) => s,
        Err(e) => return Ok(config_error(&e)),
    };

    // 2. Connection
    let api = match build_api(&args.conn) {
        Ok(api) => api,
        Err(code) => return Ok(code),
    };

    let policy = RunPolicy {
        dry_run,
        field_delay: Duration::from_millis(args.field_delay_ms),
        recheck_before_create: !args.no_recheck,
    };
    tracing::info!(
        event = "basesync.run.start",
        schema = %args.schema.display(),
        tasks = desired.tasks.len(),
        dry_run,
    );

    // 3. Reconcile
    let reconciler = Reconciler::new(Arc::new(api), policy);
    let report = match reconciler.run(&desired).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("no changes were made");
            return Ok(exit_codes::FETCH_FAILED);
        }
    };

    // 4. Report. A failed --out write does not change the exit code.
    if args.format == "json" {
        println!("{}", json::to_json(&report)?);
    } else {
        console::print_summary(&report);
    }
    if let Some(out) = &args.out {
        match json::write_json(&report, out) {
            Ok(()) => eprintln!("wrote file: {}", out.display()),
            Err(e) => {
                tracing::error!(
                    event = "basesync.report.write_failed",
                    path = %out.display(),
                    error = %e,
                );
                eprintln!("error: could not write report: {e:#}");
            }
        }
    }

    if report.has_failures() {
        Ok(exit_codes::TASK_FAILED)
    } else {
        Ok(exit_codes::OK)
    }
}
