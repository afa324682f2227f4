use crate::model::Table;
use crate::report::{MutationOutcome, RunReport, TaskStatus};

pub fn print_summary(report: &RunReport) {
    let mode = if report.dry_run { "plan" } else { "apply" };
    eprintln!(
        "\n{} tables fetched, {} tasks ({})",
        report.tables_fetched,
        report.tasks.len(),
        mode
    );

    for t in &report.tasks {
        let (icon, label) = match t.status {
            TaskStatus::UpToDate => ("✅", "UP TO DATE"),
            TaskStatus::Planned => ("📝", "PLANNED"),
            TaskStatus::Applied => ("✅", "APPLIED"),
            TaskStatus::Partial => ("⚠️ ", "PARTIAL"),
            TaskStatus::Failed => ("❌", "FAILED"),
            TaskStatus::Skipped => ("⏭️ ", "SKIPPED"),
        };
        eprintln!("{} {:<40} {}", icon, t.task, label);

        for m in &t.mutations {
            match &m.outcome {
                MutationOutcome::Planned => eprintln!("    + {}", m.mutation.describe()),
                MutationOutcome::Applied => eprintln!("    ✔ {}", m.mutation.describe()),
                MutationOutcome::Failed { status, message } => {
                    eprintln!("    ✖ {}", m.mutation.describe());
                    if let Some(s) = status {
                        eprintln!("      Status: {}", s);
                    }
                    eprintln!("      Response: {}", message);
                }
            }
        }
        for n in &t.notes {
            eprintln!("    · {}", n);
        }
        if let Some(e) = &t.error {
            eprintln!("    → {}", e.message);
        }
    }

    let s = report.summary();
    eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    eprintln!(
        "Summary: {} up to date, {} applied, {} planned, {} partial, {} failed, {} skipped",
        s.up_to_date, s.applied, s.planned, s.partial, s.failed, s.skipped
    );
    if report.dry_run {
        if s.mutations_planned > 0 {
            eprintln!(
                "{} change(s) pending. Run `basesync apply` to issue them.",
                s.mutations_planned
            );
        }
    } else {
        eprintln!(
            "Mutations: {} applied, {} failed",
            s.mutations_applied, s.mutations_failed
        );
        if s.failed + s.partial + s.skipped > 0 {
            eprintln!("Re-run after fixing the cause; only what is still missing will be created.");
        }
    }
}

/// Human listing of a fetched schema, one line per field.
pub fn print_tables(tables: &[Table]) {
    for t in tables {
        println!("{} ({})", t.name, t.id);
        for f in &t.fields {
            let primary = if t.primary_field_id.as_deref() == Some(f.id.as_str()) {
                " [primary]"
            } else {
                ""
            };
            println!("  - {:<32} {}{}", f.name, f.field_type, primary);
            if f.is_single_select() {
                println!("      choices: {}", f.choice_names().join(", "));
            }
        }
    }
    println!("\n{} tables", tables.len());
}
