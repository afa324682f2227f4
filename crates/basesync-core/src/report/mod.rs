use serde::{Deserialize, Serialize};

use crate::errors::ReconcileError;

pub mod console;
pub mod json;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Nothing was missing.
    UpToDate,
    /// Dry run: mutations computed, none issued.
    Planned,
    Applied,
    /// Some mutations applied, some failed.
    Partial,
    Failed,
    /// A required table or field was absent; nothing was issued.
    Skipped,
}

impl TaskStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TaskStatus::Partial | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    CreateTable {
        table: String,
        fields: Vec<String>,
    },
    CreateField {
        table: String,
        field: String,
        field_type: String,
    },
    UpdateChoices {
        table: String,
        field: String,
        added: Vec<String>,
        choices: Vec<String>,
    },
}

impl Mutation {
    pub fn describe(&self) -> String {
        match self {
            Mutation::CreateTable { table, fields } => {
                format!("create table '{table}' ({} fields)", fields.len())
            }
            Mutation::CreateField {
                table,
                field,
                field_type,
            } => format!("create field '{field}' ({field_type}) in '{table}'"),
            Mutation::UpdateChoices {
                table,
                field,
                added,
                ..
            } => format!("add choices [{}] to '{table}.{field}'", added.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MutationOutcome {
    Planned,
    Applied,
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub mutation: Mutation,
    pub outcome: MutationOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub kind: String,
    pub message: String,
}

impl From<&ReconcileError> for TaskError {
    fn from(e: &ReconcileError) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub task: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mutations: Vec<MutationRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl TaskReport {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            status: TaskStatus::UpToDate,
            mutations: Vec::new(),
            notes: Vec::new(),
            error: None,
        }
    }

    pub fn record(&mut self, mutation: Mutation, outcome: MutationOutcome) {
        self.mutations.push(MutationRecord { mutation, outcome });
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Derives the final status from the recorded mutations and the error
    /// (if any) that ended the task early.
    pub fn finish(mut self, error: Option<&ReconcileError>) -> Self {
        let count = |pred: fn(&MutationOutcome) -> bool| {
            self.mutations.iter().filter(|m| pred(&m.outcome)).count()
        };
        let applied = count(|o| matches!(o, MutationOutcome::Applied));
        let planned = count(|o| matches!(o, MutationOutcome::Planned));
        let failed = count(|o| matches!(o, MutationOutcome::Failed { .. }));

        self.status = match (error.is_some(), applied, planned, failed) {
            (true, 0, 0, 0) => TaskStatus::Skipped,
            (_, 0, 0, f) if f > 0 => TaskStatus::Failed,
            (_, _, _, f) if f > 0 => TaskStatus::Partial,
            (true, _, _, _) => TaskStatus::Partial,
            (false, a, _, _) if a > 0 => TaskStatus::Applied,
            (false, _, p, _) if p > 0 => TaskStatus::Planned,
            _ => TaskStatus::UpToDate,
        };
        self.error = error.map(TaskError::from);
        self
    }

    pub fn mutation_count(&self) -> usize {
        self.mutations.len()
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub generated_at: String,
    pub provider: String,
    pub dry_run: bool,
    pub tables_fetched: usize,
    pub tasks: Vec<TaskReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub up_to_date: usize,
    pub planned: usize,
    pub applied: usize,
    pub partial: usize,
    pub failed: usize,
    pub skipped: usize,
    pub mutations_planned: usize,
    pub mutations_applied: usize,
    pub mutations_failed: usize,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        let mut s = RunSummary::default();
        for t in &self.tasks {
            match t.status {
                TaskStatus::UpToDate => s.up_to_date += 1,
                TaskStatus::Planned => s.planned += 1,
                TaskStatus::Applied => s.applied += 1,
                TaskStatus::Partial => s.partial += 1,
                TaskStatus::Failed => s.failed += 1,
                TaskStatus::Skipped => s.skipped += 1,
            }
            for m in &t.mutations {
                match m.outcome {
                    MutationOutcome::Planned => s.mutations_planned += 1,
                    MutationOutcome::Applied => s.mutations_applied += 1,
                    MutationOutcome::Failed { .. } => s.mutations_failed += 1,
                }
            }
        }
        s
    }

    pub fn has_failures(&self) -> bool {
        self.tasks.iter().any(|t| t.status.is_failure())
    }

    pub fn task(&self, label: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.task == label)
    }
}
