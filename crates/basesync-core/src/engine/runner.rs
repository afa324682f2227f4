use std::sync::Arc;

use chrono::Utc;
use tokio::time::{sleep, Duration};

use crate::config::{ChoicesTask, DesiredSchema, FieldSpec, FieldsTask, TableSpec, Task};
use crate::engine::payload::{field_payload, planned_field, planned_table, table_payload};
use crate::errors::{ApiError, ReconcileError};
use crate::lookup::{find_field_by_name, find_table_by_name, table_index};
use crate::merge::{merge_choices, missing};
use crate::model::{FieldOptions, Table};
use crate::providers::remote::SchemaApi;
use crate::report::{
    Mutation, MutationOutcome, RunReport, TaskReport, REPORT_SCHEMA_VERSION,
};

pub const DEFAULT_FIELD_DELAY_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct RunPolicy {
    /// Compute mutations but issue none.
    pub dry_run: bool,
    /// Pause between successive create-field calls (remote rate limit).
    pub field_delay: Duration,
    /// Re-read the table list right before creating a table.
    pub recheck_before_create: bool,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            dry_run: false,
            field_delay: Duration::from_millis(DEFAULT_FIELD_DELAY_MS),
            recheck_before_create: true,
        }
    }
}

/// Sequential, additive reconciler.
///
/// One request is in flight at a time. The fetched schema is kept as a local
/// view and updated after every successful (or, in a dry run, planned)
/// mutation, so later tasks see tables and fields created by earlier ones.
pub struct Reconciler {
    pub api: Arc<dyn SchemaApi>,
    pub policy: RunPolicy,
}

impl Reconciler {
    pub fn new(api: Arc<dyn SchemaApi>, policy: RunPolicy) -> Self {
        Self { api, policy }
    }

    /// Reads the whole schema. An empty table list counts as a failed read.
    pub async fn fetch_schema(&self) -> Result<Vec<Table>, ReconcileError> {
        let tables = self.api.list_tables().await.map_err(|e| {
            tracing::error!(
                event = "basesync.fetch.failed",
                status = ?e.status(),
                error = %e,
                "failed to fetch schema"
            );
            ReconcileError::FetchFailure(e)
        })?;

        if tables.is_empty() {
            tracing::error!(event = "basesync.fetch.empty", "schema fetch returned no tables");
            return Err(ReconcileError::EmptySchema);
        }

        tracing::info!(
            event = "basesync.fetch.ok",
            tables = tables.len(),
            "fetched schema"
        );
        Ok(tables)
    }

    pub async fn run(&self, desired: &DesiredSchema) -> Result<RunReport, ReconcileError> {
        let mut tables = self.fetch_schema().await?;
        let tables_fetched = tables.len();

        let mut reports = Vec::with_capacity(desired.tasks.len());
        for task in &desired.tasks {
            let report = self.run_task(task, &mut tables).await;
            tracing::info!(
                event = "basesync.task.done",
                task = %report.task,
                status = ?report.status,
                mutations = report.mutation_count(),
            );
            reports.push(report);
        }

        Ok(RunReport {
            schema_version: REPORT_SCHEMA_VERSION,
            generated_at: Utc::now().to_rfc3339(),
            provider: self.api.provider_name().to_string(),
            dry_run: self.policy.dry_run,
            tables_fetched,
            tasks: reports,
        })
    }

    pub async fn run_task(&self, task: &Task, tables: &mut Vec<Table>) -> TaskReport {
        let mut report = TaskReport::new(task.label());
        let result = match task {
            Task::Table(spec) => self.ensure_table(spec, tables, &mut report).await,
            Task::Fields(t) => self.ensure_fields(t, tables, &mut report).await,
            Task::Choices(t) => self.ensure_choices(t, tables, &mut report).await,
        };

        if let Err(e) = &result {
            tracing::warn!(
                event = "basesync.task.skipped",
                task = %report.task,
                kind = e.kind(),
                error = %e,
            );
        }
        report.finish(result.err().as_ref())
    }

    async fn ensure_table(
        &self,
        spec: &TableSpec,
        tables: &mut Vec<Table>,
        report: &mut TaskReport,
    ) -> Result<(), ReconcileError> {
        if find_table_by_name(tables, &spec.name).is_some() {
            report.note(format!("table '{}' already exists", spec.name));
            return self.extend_existing_table(spec, tables, report).await;
        }

        // Resolve links before anything is issued; a missing dependency
        // means no create call at all.
        let payload = table_payload(spec, tables)?;
        let mutation = Mutation::CreateTable {
            table: spec.name.clone(),
            fields: spec.fields.iter().map(|f| f.name().to_string()).collect(),
        };

        if self.policy.dry_run {
            tables.push(planned_table(&payload));
            report.record(mutation, MutationOutcome::Planned);
            return Ok(());
        }

        if self.policy.recheck_before_create && self.appeared_concurrently(spec, tables).await {
            report.note(format!(
                "table '{}' appeared since the initial fetch; not creating it",
                spec.name
            ));
            return self.extend_existing_table(spec, tables, report).await;
        }

        match self.api.create_table(&payload).await {
            Ok(created) => {
                tracing::info!(
                    event = "basesync.table.created",
                    table = %created.name,
                    table_id = %created.id,
                    fields = created.fields.len(),
                );
                tables.push(created);
                report.record(mutation, MutationOutcome::Applied);
            }
            Err(e) => {
                let outcome = failed(&mutation, e);
                report.record(mutation, outcome);
            }
        }
        Ok(())
    }

    /// Re-reads the schema; on a hit the local view is replaced by the fresh
    /// one. A failed re-read is logged and treated as a miss.
    async fn appeared_concurrently(&self, spec: &TableSpec, tables: &mut Vec<Table>) -> bool {
        match self.api.list_tables().await {
            Ok(fresh) if find_table_by_name(&fresh, &spec.name).is_some() => {
                *tables = fresh;
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::warn!(
                    event = "basesync.table.recheck_failed",
                    table = %spec.name,
                    error = %e,
                    "re-read before create failed; creating anyway"
                );
                false
            }
        }
    }

    async fn extend_existing_table(
        &self,
        spec: &TableSpec,
        tables: &mut Vec<Table>,
        report: &mut TaskReport,
    ) -> Result<(), ReconcileError> {
        let existing: Vec<String> = find_table_by_name(tables, &spec.name)
            .map(|t| t.fields.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default();

        self.append_fields(&spec.name, &spec.fields, tables, report)
            .await?;

        // Select fields created just now already carry every declared choice.
        for f in &spec.fields {
            let FieldSpec::SingleSelect { name, choices } = f else {
                continue;
            };
            if !existing.iter().any(|n| n == name) {
                continue;
            }
            match self
                .extend_choices(&spec.name, name, choices, tables, report)
                .await
            {
                Ok(()) => {}
                Err(e @ ReconcileError::TypeMismatch { .. }) => report.note(e.to_string()),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn ensure_fields(
        &self,
        task: &FieldsTask,
        tables: &mut Vec<Table>,
        report: &mut TaskReport,
    ) -> Result<(), ReconcileError> {
        self.append_fields(&task.table, &task.fields, tables, report)
            .await
    }

    async fn ensure_choices(
        &self,
        task: &ChoicesTask,
        tables: &mut Vec<Table>,
        report: &mut TaskReport,
    ) -> Result<(), ReconcileError> {
        self.extend_choices(&task.table, &task.field, &task.choices, tables, report)
            .await
    }

    /// Creates the declared fields the table lacks, one call per field.
    /// A failed call is recorded and the batch continues.
    async fn append_fields(
        &self,
        table_name: &str,
        specs: &[FieldSpec],
        tables: &mut [Table],
        report: &mut TaskReport,
    ) -> Result<(), ReconcileError> {
        let idx = table_index(tables, table_name)
            .ok_or_else(|| ReconcileError::TableNotFound(table_name.to_string()))?;
        let table_id = tables[idx].id.clone();

        let missing_names = missing(
            specs.iter().map(|s| s.name()),
            tables[idx].fields.iter().map(|f| f.name.as_str()),
        );
        let payloads = specs
            .iter()
            .filter(|s| missing_names.contains(&s.name()))
            .map(|s| field_payload(s, tables))
            .collect::<Result<Vec<_>, _>>()?;

        for (i, payload) in payloads.iter().enumerate() {
            let mutation = Mutation::CreateField {
                table: table_name.to_string(),
                field: payload.name.clone(),
                field_type: payload.field_type.clone(),
            };
            if self.policy.dry_run {
                tables[idx].fields.push(planned_field(payload));
                report.record(mutation, MutationOutcome::Planned);
                continue;
            }
            if i > 0 && !self.policy.field_delay.is_zero() {
                sleep(self.policy.field_delay).await;
            }

            match self.api.create_field(&table_id, payload).await {
                Ok(field) => {
                    tracing::info!(
                        event = "basesync.field.created",
                        table = %table_name,
                        field = %field.name,
                        field_id = %field.id,
                    );
                    tables[idx].fields.push(field);
                    report.record(mutation, MutationOutcome::Applied);
                }
                Err(e) => {
                    let outcome = failed(&mutation, e);
                    report.record(mutation, outcome);
                }
            }
        }
        Ok(())
    }

    /// Read-modify-write of a single-select field's choice list.
    async fn extend_choices(
        &self,
        table_name: &str,
        field_name: &str,
        required: &[String],
        tables: &mut [Table],
        report: &mut TaskReport,
    ) -> Result<(), ReconcileError> {
        let idx = table_index(tables, table_name)
            .ok_or_else(|| ReconcileError::TableNotFound(table_name.to_string()))?;
        let field = find_field_by_name(Some(&tables[idx]), field_name).ok_or_else(|| {
            ReconcileError::FieldNotFound {
                table: table_name.to_string(),
                field: field_name.to_string(),
            }
        })?;
        if !field.is_single_select() {
            return Err(ReconcileError::TypeMismatch {
                table: table_name.to_string(),
                field: field_name.to_string(),
                actual: field.field_type.clone(),
            });
        }

        let merged = merge_choices(field.choices(), required);
        if merged.is_unchanged() {
            return Ok(());
        }

        let table_id = tables[idx].id.clone();
        let field_id = field.id.clone();
        let mutation = Mutation::UpdateChoices {
            table: table_name.to_string(),
            field: field_name.to_string(),
            added: merged.added.clone(),
            choices: merged.names(),
        };
        if self.policy.dry_run {
            if let Some(slot) = tables[idx].fields.iter_mut().find(|f| f.id == field_id) {
                slot.options.get_or_insert_with(FieldOptions::default).choices =
                    Some(merged.choices);
            }
            report.record(mutation, MutationOutcome::Planned);
            return Ok(());
        }

        match self
            .api
            .update_choices(&table_id, &field_id, &merged.choices)
            .await
        {
            Ok(updated) => {
                tracing::info!(
                    event = "basesync.choices.updated",
                    table = %table_name,
                    field = %field_name,
                    added = ?merged.added,
                    total = updated.choices().len(),
                );
                if let Some(slot) = tables[idx].fields.iter_mut().find(|f| f.id == field_id) {
                    *slot = updated;
                }
                report.record(mutation, MutationOutcome::Applied);
            }
            Err(e) => {
                let outcome = failed(&mutation, e);
                report.record(mutation, outcome);
            }
        }
        Ok(())
    }
}

/// A rejected call ends only its own mutation.
fn failed(mutation: &Mutation, source: ApiError) -> MutationOutcome {
    let status = source.status();
    let message = match &source {
        ApiError::Status { body, .. } => body.clone(),
        other => other.to_string(),
    };
    let err = ReconcileError::MutationFailure {
        action: mutation.describe(),
        source,
    };
    tracing::warn!(
        event = "basesync.mutation.failed",
        kind = err.kind(),
        status = ?status,
        error = %err,
    );
    MutationOutcome::Failed { status, message }
}
