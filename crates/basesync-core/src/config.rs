use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub mod api;

pub const SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// The schema the remote base must be a superset of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredSchema {
    #[serde(default)]
    pub version: u32,
    pub tasks: Vec<Task>,
}

/// One independent unit of reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// Create the table if absent; otherwise reconcile its fields and choices.
    Table(TableSpec),
    /// Add missing fields to a table that must already exist.
    Fields(FieldsTask),
    /// Extend the choices of an existing single-select field.
    Choices(ChoicesTask),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldsTask {
    pub table: String,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChoicesTask {
    pub table: String,
    pub field: String,
    pub choices: Vec<String>,
}

/// A desired field, tagged by its remote type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", deny_unknown_fields)]
pub enum FieldSpec {
    SingleLineText {
        name: String,
    },
    MultilineText {
        name: String,
    },
    PhoneNumber {
        name: String,
    },
    Checkbox {
        name: String,
        #[serde(default = "default_checkbox_icon")]
        icon: String,
        #[serde(default = "default_checkbox_color")]
        color: String,
    },
    DateTime {
        name: String,
        #[serde(default)]
        date_format: DateFormat,
        #[serde(default)]
        time_format: TimeFormat,
        #[serde(default = "default_time_zone")]
        time_zone: String,
    },
    SingleSelect {
        name: String,
        choices: Vec<String>,
    },
    /// `linked_table` is a table *name*; it is resolved to an id at run time.
    MultipleRecordLinks {
        name: String,
        linked_table: String,
        #[serde(default = "default_true")]
        prefers_single_record_link: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    Local,
    Friendly,
    Us,
    European,
    #[default]
    Iso,
}

impl DateFormat {
    pub fn name(&self) -> &'static str {
        match self {
            DateFormat::Local => "local",
            DateFormat::Friendly => "friendly",
            DateFormat::Us => "us",
            DateFormat::European => "european",
            DateFormat::Iso => "iso",
        }
    }

    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::Local => "l",
            DateFormat::Friendly => "LL",
            DateFormat::Us => "M/D/YYYY",
            DateFormat::European => "D/M/YYYY",
            DateFormat::Iso => "YYYY-MM-DD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "12hour")]
    TwelveHour,
    #[default]
    #[serde(rename = "24hour")]
    TwentyFourHour,
}

impl TimeFormat {
    pub fn name(&self) -> &'static str {
        match self {
            TimeFormat::TwelveHour => "12hour",
            TimeFormat::TwentyFourHour => "24hour",
        }
    }

    pub fn pattern(&self) -> &'static str {
        match self {
            TimeFormat::TwelveHour => "h:mma",
            TimeFormat::TwentyFourHour => "HH:mm",
        }
    }
}

fn default_checkbox_icon() -> String {
    "check".into()
}

fn default_checkbox_color() -> String {
    "greenBright".into()
}

fn default_time_zone() -> String {
    "utc".into()
}

fn default_true() -> bool {
    true
}

impl FieldSpec {
    pub fn name(&self) -> &str {
        match self {
            FieldSpec::SingleLineText { name }
            | FieldSpec::MultilineText { name }
            | FieldSpec::PhoneNumber { name }
            | FieldSpec::Checkbox { name, .. }
            | FieldSpec::DateTime { name, .. }
            | FieldSpec::SingleSelect { name, .. }
            | FieldSpec::MultipleRecordLinks { name, .. } => name.as_str(),
        }
    }

    /// Remote type tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldSpec::SingleLineText { .. } => "singleLineText",
            FieldSpec::MultilineText { .. } => "multilineText",
            FieldSpec::PhoneNumber { .. } => "phoneNumber",
            FieldSpec::Checkbox { .. } => "checkbox",
            FieldSpec::DateTime { .. } => "dateTime",
            FieldSpec::SingleSelect { .. } => crate::model::SINGLE_SELECT,
            FieldSpec::MultipleRecordLinks { .. } => "multipleRecordLinks",
        }
    }

    pub fn choices(&self) -> Option<&[String]> {
        match self {
            FieldSpec::SingleSelect { choices, .. } => Some(choices.as_slice()),
            _ => None,
        }
    }

    pub fn linked_table(&self) -> Option<&str> {
        match self {
            FieldSpec::MultipleRecordLinks { linked_table, .. } => Some(linked_table.as_str()),
            _ => None,
        }
    }
}

impl Task {
    /// Short human label, e.g. `table FeedbackSessions`.
    pub fn label(&self) -> String {
        match self {
            Task::Table(t) => format!("table {}", t.name),
            Task::Fields(t) => format!("fields {}", t.table),
            Task::Choices(t) => format!("choices {}.{}", t.table, t.field),
        }
    }
}

pub fn load_schema(path: &Path, strict: bool) -> Result<DesiredSchema, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_schema(&raw, path, strict)
}

pub fn parse_schema(raw: &str, path: &Path, strict: bool) -> Result<DesiredSchema, ConfigError> {
    let mut ignored_keys = Vec::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);

    let schema: DesiredSchema = serde_ignored::deserialize(deserializer, |p| {
        ignored_keys.push(p.to_string());
    })
    .map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    // YAML anchors conventionally live under x- keys
    let meaningful: Vec<String> = ignored_keys
        .into_iter()
        .filter(|k| !k.starts_with("x-") && !k.starts_with('_'))
        .collect();

    if !meaningful.is_empty() {
        if strict {
            return Err(ConfigError::UnknownFields {
                path: path.to_path_buf(),
                fields: meaningful,
            });
        }
        tracing::warn!(
            event = "basesync.config.unknown_fields",
            path = %path.display(),
            fields = ?meaningful,
            "ignoring unknown schema fields"
        );
    }

    validate_schema(&schema)?;
    Ok(schema)
}

pub fn validate_schema(schema: &DesiredSchema) -> Result<(), ConfigError> {
    if schema.version != SUPPORTED_SCHEMA_VERSION {
        return Err(ConfigError::UnsupportedVersion {
            found: schema.version,
            supported: SUPPORTED_SCHEMA_VERSION,
        });
    }

    if schema.tasks.is_empty() {
        return Err(ConfigError::Invalid("schema has no tasks".into()));
    }

    for task in &schema.tasks {
        let label = task.label();
        match task {
            Task::Table(t) => {
                require_name(&t.name, "table name", &label)?;
                if t.fields.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "{label}: a table needs at least one field (the first becomes the primary field)"
                    )));
                }
                validate_fields(&t.fields, &label)?;
            }
            Task::Fields(t) => {
                require_name(&t.table, "table name", &label)?;
                if t.fields.is_empty() {
                    return Err(ConfigError::Invalid(format!("{label}: no fields listed")));
                }
                validate_fields(&t.fields, &label)?;
            }
            Task::Choices(t) => {
                require_name(&t.table, "table name", &label)?;
                require_name(&t.field, "field name", &label)?;
                validate_choices(&t.choices, &label)?;
            }
        }
    }

    Ok(())
}

fn validate_fields(fields: &[FieldSpec], label: &str) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for f in fields {
        require_name(f.name(), "field name", label)?;
        if !seen.insert(f.name()) {
            return Err(ConfigError::Invalid(format!(
                "{label}: field '{}' declared twice",
                f.name()
            )));
        }
        if let Some(choices) = f.choices() {
            validate_choices(choices, &format!("{label}.{}", f.name()))?;
        }
        if let Some(linked) = f.linked_table() {
            require_name(linked, "linked_table", label)?;
        }
    }
    Ok(())
}

fn validate_choices(choices: &[String], label: &str) -> Result<(), ConfigError> {
    if choices.is_empty() {
        return Err(ConfigError::Invalid(format!("{label}: no choices listed")));
    }
    if let Some(blank) = choices.iter().find(|c| c.trim().is_empty()) {
        return Err(ConfigError::Invalid(format!(
            "{label}: blank choice name {blank:?}"
        )));
    }
    Ok(())
}

fn require_name(value: &str, what: &str, label: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{label}: empty {what}")));
    }
    Ok(())
}

pub fn write_sample_schema(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, SAMPLE_SCHEMA).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub const SAMPLE_SCHEMA: &str = r#"version: 1
tasks:
  - kind: table
    name: FeedbackSessions
    fields:
      - { name: salesperson_phone, type: phoneNumber }
      - { name: customer_phone, type: phoneNumber }
      - { name: customer_name, type: singleLineText }
      - { name: feedback_type, type: singleSelect, choices: [audio, text] }
      - { name: raw_input, type: multilineText }
      - { name: transcription, type: multilineText }
      - name: state
        type: singleSelect
        choices:
          - awaiting_transcription
          - awaiting_extraction
          - awaiting_confirmation
          - completed
          - cancelled
      - { name: created_at, type: dateTime }
      - { name: tenant_id, type: multipleRecordLinks, linked_table: Tenants }

  - kind: fields
    table: Settings
    fields:
      - { name: verification_enabled, type: checkbox }
      - { name: offers_purchase, type: checkbox }

  - kind: fields
    table: Customers
    fields:
      - { name: city, type: singleLineText }

  - kind: choices
    table: VerificationSessions
    field: state
    choices:
      - awaiting_cpf
      - awaiting_watch_info
      - awaiting_watch_photo
      - processing
      - completed
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<DesiredSchema, ConfigError> {
        parse_schema(raw, Path::new("test.yaml"), true)
    }

    #[test]
    fn test_sample_schema_loads() {
        let schema = parse(SAMPLE_SCHEMA).unwrap();
        assert_eq!(schema.tasks.len(), 4);

        let Task::Table(feedback) = &schema.tasks[0] else {
            panic!("expected table task");
        };
        assert_eq!(feedback.name, "FeedbackSessions");
        assert_eq!(feedback.fields[0].type_name(), "phoneNumber");
        assert_eq!(
            feedback.fields.last().unwrap().linked_table(),
            Some("Tenants")
        );
    }

    #[test]
    fn test_field_defaults() {
        let schema = parse(
            r#"
version: 1
tasks:
  - kind: fields
    table: Settings
    fields:
      - { name: active, type: checkbox }
      - { name: created_at, type: dateTime }
      - { name: tenant, type: multipleRecordLinks, linked_table: Tenants }
"#,
        )
        .unwrap();

        let Task::Fields(t) = &schema.tasks[0] else {
            panic!("expected fields task");
        };
        assert_eq!(
            t.fields[0],
            FieldSpec::Checkbox {
                name: "active".into(),
                icon: "check".into(),
                color: "greenBright".into()
            }
        );
        assert_eq!(
            t.fields[1],
            FieldSpec::DateTime {
                name: "created_at".into(),
                date_format: DateFormat::Iso,
                time_format: TimeFormat::TwentyFourHour,
                time_zone: "utc".into()
            }
        );
        assert_eq!(
            t.fields[2],
            FieldSpec::MultipleRecordLinks {
                name: "tenant".into(),
                linked_table: "Tenants".into(),
                prefers_single_record_link: true
            }
        );
    }

    #[test]
    fn test_unknown_top_level_key_strict_vs_lenient() {
        let raw = r#"
version: 1
taskz: []
tasks:
  - { kind: choices, table: T, field: f, choices: [a] }
"#;
        let err = parse(raw).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFields { ref fields, .. } if fields == &vec!["taskz".to_string()]));

        let lenient = parse_schema(raw, Path::new("test.yaml"), false).unwrap();
        assert_eq!(lenient.tasks.len(), 1);
    }

    #[test]
    fn test_unknown_field_option_rejected() {
        let raw = r#"
version: 1
tasks:
  - kind: fields
    table: Settings
    fields:
      - { name: active, type: checkbox, colour: red }
"#;
        assert!(matches!(parse(raw), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_unknown_field_type_rejected() {
        let raw = r#"
version: 1
tasks:
  - kind: fields
    table: Settings
    fields:
      - { name: score, type: rating }
"#;
        assert!(matches!(parse(raw), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_version_required() {
        let raw = r#"
tasks:
  - { kind: choices, table: T, field: f, choices: [a] }
"#;
        assert!(matches!(
            parse(raw),
            Err(ConfigError::UnsupportedVersion { found: 0, .. })
        ));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let raw = r#"
version: 1
tasks:
  - kind: table
    name: Brand
    fields:
      - { name: brand_name, type: singleLineText }
      - { name: brand_name, type: multilineText }
"#;
        let err = parse(raw).unwrap_err();
        assert!(err.to_string().contains("declared twice"), "{err}");
    }

    #[test]
    fn test_empty_choices_rejected() {
        let raw = r#"
version: 1
tasks:
  - { kind: choices, table: VerificationSessions, field: state, choices: [] }
"#;
        assert!(matches!(parse(raw), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_table_without_fields_rejected() {
        let raw = r#"
version: 1
tasks:
  - { kind: table, name: Empty, fields: [] }
"#;
        assert!(matches!(parse(raw), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_task_labels() {
        let schema = parse(SAMPLE_SCHEMA).unwrap();
        let labels: Vec<String> = schema.tasks.iter().map(Task::label).collect();
        assert_eq!(
            labels,
            vec![
                "table FeedbackSessions",
                "fields Settings",
                "fields Customers",
                "choices VerificationSessions.state"
            ]
        );
    }
}
