use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SINGLE_SELECT: &str = "singleSelect";

/// A table as reported by the remote schema API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<FieldOptions>,
}

/// Type-specific field options. Only `choices` is interpreted; everything
/// else is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One option of a single-select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Choice {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

impl Field {
    pub fn is_single_select(&self) -> bool {
        self.field_type == SINGLE_SELECT
    }

    /// Current choices in remote order; empty for non-select fields.
    pub fn choices(&self) -> &[Choice] {
        self.options
            .as_ref()
            .and_then(|o| o.choices.as_deref())
            .unwrap_or(&[])
    }

    pub fn choice_names(&self) -> Vec<&str> {
        self.choices().iter().map(|c| c.name.as_str()).collect()
    }
}

/// Body of the list-tables response.
#[derive(Debug, Clone, Deserialize)]
pub struct ListTablesResponse {
    pub tables: Vec<Table>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote_table() {
        let raw = r#"{
            "id": "tblA",
            "name": "VerificationSessions",
            "primaryFieldId": "fld1",
            "fields": [
                {"id": "fld1", "name": "customer_phone", "type": "phoneNumber"},
                {"id": "fld2", "name": "state", "type": "singleSelect",
                 "options": {"choices": [
                    {"id": "selA", "name": "draft", "color": "blueLight2"},
                    {"id": "selB", "name": "sent"}
                 ]}},
                {"id": "fld3", "name": "created_at", "type": "dateTime",
                 "options": {"timeZone": "utc", "dateFormat": {"name": "iso", "format": "YYYY-MM-DD"}}}
            ]
        }"#;

        let table: Table = serde_json::from_str(raw).unwrap();
        assert_eq!(table.primary_field_id.as_deref(), Some("fld1"));
        assert_eq!(table.fields.len(), 3);

        let state = &table.fields[1];
        assert!(state.is_single_select());
        assert_eq!(state.choice_names(), vec!["draft", "sent"]);
        assert_eq!(state.choices()[0].color.as_deref(), Some("blueLight2"));

        let created = &table.fields[2];
        assert!(created.choices().is_empty());
        let extra = &created.options.as_ref().unwrap().extra;
        assert_eq!(extra["timeZone"], "utc");
    }

    #[test]
    fn test_existing_choice_serializes_unchanged() {
        let choice = Choice {
            id: Some("selA".into()),
            name: "draft".into(),
            color: Some("blueLight2".into()),
        };
        let v = serde_json::to_value(&choice).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"id": "selA", "name": "draft", "color": "blueLight2"})
        );

        let bare = serde_json::to_value(Choice::named("sent")).unwrap();
        assert_eq!(bare, serde_json::json!({"name": "sent"}));
    }
}
