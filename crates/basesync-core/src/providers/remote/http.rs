use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{FieldPayload, SchemaApi, TablePayload};
use crate::config::api::ApiConfig;
use crate::errors::ApiError;
use crate::model::{Choice, Field, ListTablesResponse, Table};

/// reqwest-backed client for the hosted metadata API.
pub struct HttpSchemaApi {
    config: ApiConfig,
    client: reqwest::Client,
}

impl HttpSchemaApi {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
    }
}

#[async_trait]
impl SchemaApi for HttpSchemaApi {
    async fn list_tables(&self) -> Result<Vec<Table>, ApiError> {
        let url = self.config.tables_url();
        let resp = self.request(reqwest::Method::GET, &url).send().await?;
        let body: ListTablesResponse = handle_response(resp).await?;
        Ok(body.tables)
    }

    async fn create_table(&self, table: &TablePayload) -> Result<Table, ApiError> {
        let url = self.config.tables_url();
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(table)
            .send()
            .await?;
        handle_response(resp).await
    }

    async fn create_field(&self, table_id: &str, field: &FieldPayload) -> Result<Field, ApiError> {
        let url = format!("{}/{}/fields", self.config.tables_url(), table_id);
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(field)
            .send()
            .await?;
        handle_response(resp).await
    }

    async fn update_choices(
        &self,
        table_id: &str,
        field_id: &str,
        choices: &[Choice],
    ) -> Result<Field, ApiError> {
        let url = format!(
            "{}/{}/fields/{}",
            self.config.tables_url(),
            table_id,
            field_id
        );
        let body = json!({ "options": { "choices": choices } });
        let resp = self
            .request(reqwest::Method::PATCH, &url)
            .json(&body)
            .send()
            .await?;
        handle_response(resp).await
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}

async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}
