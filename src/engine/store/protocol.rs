//! Remote store wire contract
//!
//! A single POST endpoint accepts `{action, payload}` and answers
//! `{ok: true, items?}` or `{ok: false, error}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::engine::model::AuditRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    ReplaceAll,
    Upsert,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::ReplaceAll => "replace_all",
            Action::Upsert => "upsert",
            Action::Delete => "delete",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "list" => Some(Action::List),
            "replace_all" => Some(Action::ReplaceAll),
            "upsert" => Some(Action::Upsert),
            "delete" => Some(Action::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiRequest {
    /// `list`, `replace_all`, `upsert` or `delete`
    pub action: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Value,
}

impl ApiRequest {
    pub fn new(action: Action, payload: Value) -> Self {
        Self {
            action: action.as_str().to_string(),
            payload,
        }
    }

    pub fn empty(action: Action) -> Self {
        Self::new(action, Value::Object(Map::new()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub items: Option<Vec<AuditRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn success() -> Self {
        Self {
            ok: true,
            ..Default::default()
        }
    }

    pub fn with_items(items: Vec<AuditRecord>) -> Self {
        Self {
            ok: true,
            items: Some(items),
            ..Default::default()
        }
    }

    pub fn with_deleted(deleted: bool) -> Self {
        Self {
            ok: true,
            deleted: Some(deleted),
            ..Default::default()
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

// ========== Payloads ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsPayload {
    #[serde(default)]
    pub items: Vec<AuditRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemPayload {
    pub item: AuditRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdPayload {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let request = ApiRequest::empty(Action::List);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"action": "list", "payload": {}})
        );
    }

    #[test]
    fn test_response_omits_absent_fields() {
        assert_eq!(
            serde_json::to_value(ApiResponse::success()).unwrap(),
            json!({"ok": true})
        );
        assert_eq!(
            serde_json::to_value(ApiResponse::failure("boom")).unwrap(),
            json!({"ok": false, "error": "boom"})
        );
    }

    #[test]
    fn test_action_names() {
        for action in [Action::List, Action::ReplaceAll, Action::Upsert, Action::Delete] {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
        assert_eq!(Action::parse("drop_table"), None);
    }
}
