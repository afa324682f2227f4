//! Desired field specs → request bodies.
//!
//! Link fields name their target table; the id is looked up in the schema
//! as currently known to the run, so a table created by an earlier task can
//! be linked to by a later one.

use serde_json::json;

use crate::config::{FieldSpec, TableSpec};
use crate::errors::ReconcileError;
use crate::lookup::find_table_by_name;
use crate::merge::merge_choices;
use crate::model::{Field, Table};
use crate::providers::remote::{FieldPayload, TablePayload};

pub fn field_payload(spec: &FieldSpec, tables: &[Table]) -> Result<FieldPayload, ReconcileError> {
    let options = match spec {
        FieldSpec::SingleLineText { .. }
        | FieldSpec::MultilineText { .. }
        | FieldSpec::PhoneNumber { .. } => None,
        FieldSpec::Checkbox { icon, color, .. } => Some(json!({ "icon": icon, "color": color })),
        FieldSpec::DateTime {
            date_format,
            time_format,
            time_zone,
            ..
        } => Some(json!({
            "dateFormat": { "name": date_format.name(), "format": date_format.pattern() },
            "timeFormat": { "name": time_format.name(), "format": time_format.pattern() },
            "timeZone": time_zone,
        })),
        FieldSpec::SingleSelect { choices, .. } => {
            let merged = merge_choices(&[], choices);
            Some(json!({ "choices": merged.choices }))
        }
        FieldSpec::MultipleRecordLinks {
            name,
            linked_table,
            prefers_single_record_link,
        } => {
            let target = find_table_by_name(tables, linked_table).ok_or_else(|| {
                ReconcileError::LinkTargetNotFound {
                    field: name.clone(),
                    linked_table: linked_table.clone(),
                }
            })?;
            Some(json!({
                "linkedTableId": target.id,
                "prefersSingleRecordLink": prefers_single_record_link,
            }))
        }
    };

    Ok(FieldPayload {
        name: spec.name().to_string(),
        field_type: spec.type_name().to_string(),
        options,
    })
}

/// Fails on the first unresolved link so no partial table is ever created.
pub fn table_payload(spec: &TableSpec, tables: &[Table]) -> Result<TablePayload, ReconcileError> {
    let fields = spec
        .fields
        .iter()
        .map(|f| field_payload(f, tables))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TablePayload {
        name: spec.name.clone(),
        description: spec.description.clone(),
        fields,
    })
}

/// Stand-in for a field a dry run would create, so later tasks in the same
/// plan see it exactly as they would after an apply.
pub fn planned_field(payload: &FieldPayload) -> Field {
    Field {
        id: format!("planned:{}", payload.name),
        name: payload.name.clone(),
        field_type: payload.field_type.clone(),
        description: None,
        options: payload
            .options
            .clone()
            .and_then(|v| serde_json::from_value(v).ok()),
    }
}

pub fn planned_table(payload: &TablePayload) -> Table {
    let fields: Vec<Field> = payload.fields.iter().map(planned_field).collect();
    Table {
        id: format!("planned:{}", payload.name),
        name: payload.name.clone(),
        primary_field_id: fields.first().map(|f| f.id.clone()),
        description: payload.description.clone(),
        fields,
    }
}
