//! Shared endpoint backend
//! Speaks the `{action, payload}` contract over a single POST URL

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, warn};

use super::protocol::{Action, ApiRequest, IdPayload, ItemPayload, ItemsPayload};
use super::{AuditStore, Result, StoreError};
use crate::engine::model::AuditRecord;

pub struct RemoteStore {
    endpoint: String,
    http_client: reqwest::Client,
}

impl RemoteStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Send one action and return the parsed response body.
    ///
    /// The body goes out as plain text so spreadsheet web apps accept it
    /// without a CORS preflight. Anything other than a success status with a
    /// JSON body carrying `ok: true` is an error.
    async fn request(&self, request: ApiRequest) -> Result<Value> {
        let body = serde_json::to_string(&request)?;
        debug!(action = %request.action, endpoint = %self.endpoint, "sending store request");

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let data: Option<Value> = serde_json::from_str(&text).ok();

        let ok = data
            .as_ref()
            .and_then(|d| d.get("ok"))
            .and_then(Value::as_bool)
            == Some(true);

        match data {
            Some(data) if ok && status.is_success() => Ok(data),
            data => {
                let message = data
                    .as_ref()
                    .and_then(|d| d.get("error"))
                    .and_then(error_message)
                    .unwrap_or_else(|| format!("Request failed ({})", status.as_u16()));
                warn!(action = %request.action, status = status.as_u16(), error = %message, "store request failed");
                Err(StoreError::Remote(message))
            }
        }
    }
}

#[async_trait]
impl AuditStore for RemoteStore {
    fn describe(&self) -> String {
        format!("remote ({})", self.endpoint)
    }

    async fn load(&self) -> Result<Vec<AuditRecord>> {
        let data = self.request(ApiRequest::empty(Action::List)).await?;
        let items = match data {
            Value::Object(mut map) => map.remove("items"),
            _ => None,
        };
        match items {
            Some(items @ Value::Array(_)) => Ok(serde_json::from_value(items)?),
            _ => Ok(Vec::new()),
        }
    }

    async fn save_all(&self, records: &[AuditRecord]) -> Result<()> {
        let payload = serde_json::to_value(ItemsPayload {
            items: records.to_vec(),
        })?;
        self.request(ApiRequest::new(Action::ReplaceAll, payload)).await?;
        Ok(())
    }

    async fn upsert(&self, record: &AuditRecord) -> Result<()> {
        let payload = serde_json::to_value(ItemPayload {
            item: record.clone(),
        })?;
        self.request(ApiRequest::new(Action::Upsert, payload)).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let payload = serde_json::to_value(IdPayload { id: id.to_string() })?;
        let data = self.request(ApiRequest::new(Action::Delete, payload)).await?;
        Ok(data.get("deleted").and_then(Value::as_bool).unwrap_or(false))
    }
}

/// Falsy `error` values fall back to the status message.
fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
