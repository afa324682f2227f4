use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::errors::ApiError;
use crate::model::{Choice, Field, Table};

/// The four schema operations the reconciler needs from the remote service.
///
/// Calls are issued strictly one at a time by the reconciler; implementations
/// do not need to handle concurrent use beyond being `Send + Sync`.
#[async_trait]
pub trait SchemaApi: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<Table>, ApiError>;

    async fn create_table(&self, table: &TablePayload) -> Result<Table, ApiError>;

    async fn create_field(&self, table_id: &str, field: &FieldPayload) -> Result<Field, ApiError>;

    /// Replaces the field's whole choice list with `choices`.
    async fn update_choices(
        &self,
        table_id: &str,
        field_id: &str,
        choices: &[Choice],
    ) -> Result<Field, ApiError>;

    fn provider_name(&self) -> &'static str;
}

/// Request body for one field, as the remote API expects it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FieldPayload>,
}

pub mod fake;
pub mod http;
