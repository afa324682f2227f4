use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{FieldPayload, SchemaApi, TablePayload};
use crate::errors::ApiError;
use crate::model::{Choice, Field, FieldOptions, Table};

/// Every call the fake has seen, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListTables,
    CreateTable {
        name: String,
    },
    CreateField {
        table_id: String,
        name: String,
    },
    UpdateChoices {
        table_id: String,
        field_id: String,
        choices: Vec<String>,
    },
}

impl ApiCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, ApiCall::ListTables)
    }
}

/// In-memory schema API with the remote service's full-replace semantics.
///
/// Mutations whose target name was registered with [`FakeSchemaApi::fail_on`]
/// answer with HTTP 422 and leave the state alone.
#[derive(Debug, Default)]
pub struct FakeSchemaApi {
    state: Mutex<FakeState>,
}

#[derive(Debug, Default)]
struct FakeState {
    tables: Vec<Table>,
    calls: Vec<ApiCall>,
    fail_names: HashSet<String>,
    list_failure: Option<(u16, String)>,
    appears_on_next_list: Option<Table>,
    next_id: u64,
}

impl FakeState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:04}", self.next_id)
    }

    fn rejected(&self, name: &str) -> Option<ApiError> {
        self.fail_names.contains(name).then(|| ApiError::Status {
            status: 422,
            body: format!(r#"{{"error":{{"type":"INVALID_REQUEST","message":"rejected {name}"}}}}"#),
        })
    }

    fn field_from_payload(&mut self, payload: &FieldPayload) -> Result<Field, ApiError> {
        let mut options: Option<FieldOptions> = payload
            .options
            .clone()
            .map(serde_json::from_value)
            .transpose()?;
        if let Some(choices) = options.as_mut().and_then(|o| o.choices.as_mut()) {
            for c in choices.iter_mut() {
                if c.id.is_none() {
                    c.id = Some(self.id("sel"));
                }
            }
        }
        Ok(Field {
            id: self.id("fld"),
            name: payload.name.clone(),
            field_type: payload.field_type.clone(),
            description: None,
            options,
        })
    }
}

impl FakeSchemaApi {
    pub fn new(tables: Vec<Table>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                tables,
                ..FakeState::default()
            }),
        }
    }

    /// Reject any mutation targeting a table or field with this name.
    pub fn fail_on(self, name: impl Into<String>) -> Self {
        self.lock().fail_names.insert(name.into());
        self
    }

    /// Make every list-tables call fail with the given status.
    pub fn fail_list(self, status: u16, body: impl Into<String>) -> Self {
        self.lock().list_failure = Some((status, body.into()));
        self
    }

    /// Insert `table` right before the next list-tables call is answered,
    /// simulating a concurrent writer.
    pub fn table_appears_on_next_list(self, table: Table) -> Self {
        self.lock().appears_on_next_list = Some(table);
        self
    }

    pub fn tables(&self) -> Vec<Table> {
        self.lock().tables.clone()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    pub fn mutation_calls(&self) -> Vec<ApiCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SchemaApi for FakeSchemaApi {
    async fn list_tables(&self) -> Result<Vec<Table>, ApiError> {
        let mut st = self.lock();
        st.calls.push(ApiCall::ListTables);
        if let Some((status, body)) = st.list_failure.clone() {
            return Err(ApiError::Status { status, body });
        }
        if let Some(table) = st.appears_on_next_list.take() {
            st.tables.push(table);
        }
        Ok(st.tables.clone())
    }

    async fn create_table(&self, table: &TablePayload) -> Result<Table, ApiError> {
        let mut st = self.lock();
        st.calls.push(ApiCall::CreateTable {
            name: table.name.clone(),
        });
        if let Some(err) = st.rejected(&table.name) {
            return Err(err);
        }

        let fields = table
            .fields
            .iter()
            .map(|f| st.field_from_payload(f))
            .collect::<Result<Vec<_>, _>>()?;
        let created = Table {
            id: st.id("tbl"),
            name: table.name.clone(),
            primary_field_id: fields.first().map(|f| f.id.clone()),
            description: table.description.clone(),
            fields,
        };
        st.tables.push(created.clone());
        Ok(created)
    }

    async fn create_field(&self, table_id: &str, field: &FieldPayload) -> Result<Field, ApiError> {
        let mut st = self.lock();
        st.calls.push(ApiCall::CreateField {
            table_id: table_id.to_string(),
            name: field.name.clone(),
        });
        if let Some(err) = st.rejected(&field.name) {
            return Err(err);
        }
        let Some(idx) = st.tables.iter().position(|t| t.id == table_id) else {
            return Err(ApiError::Status {
                status: 404,
                body: format!("table {table_id} not found"),
            });
        };

        let created = st.field_from_payload(field)?;
        if st.tables[idx].fields.iter().any(|f| f.name == created.name) {
            return Err(ApiError::Status {
                status: 422,
                body: format!("duplicate field name {}", created.name),
            });
        }
        st.tables[idx].fields.push(created.clone());
        Ok(created)
    }

    async fn update_choices(
        &self,
        table_id: &str,
        field_id: &str,
        choices: &[Choice],
    ) -> Result<Field, ApiError> {
        let mut st = self.lock();
        st.calls.push(ApiCall::UpdateChoices {
            table_id: table_id.to_string(),
            field_id: field_id.to_string(),
            choices: choices.iter().map(|c| c.name.clone()).collect(),
        });

        let location = st.tables.iter().enumerate().find_map(|(ti, t)| {
            (t.id == table_id)
                .then(|| t.fields.iter().position(|f| f.id == field_id))
                .flatten()
                .map(|fi| (ti, fi))
        });
        let Some((ti, fi)) = location else {
            return Err(ApiError::Status {
                status: 404,
                body: format!("field {field_id} not found"),
            });
        };
        let field_name = st.tables[ti].fields[fi].name.clone();
        if let Some(err) = st.rejected(&field_name) {
            return Err(err);
        }

        let mut replaced = choices.to_vec();
        for c in replaced.iter_mut() {
            if c.id.is_none() {
                c.id = Some(st.id("sel"));
            }
        }
        let field = &mut st.tables[ti].fields[fi];
        field.options.get_or_insert_with(FieldOptions::default).choices = Some(replaced);
        Ok(field.clone())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
