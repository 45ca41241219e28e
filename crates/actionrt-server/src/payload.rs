use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP-style status carried by synthesized error replies.
pub const ERROR_STATUS: &str = "500 Internal Server Error";

/// Decoded request payload handed to an action handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Command {
    /// Command name chosen by the caller.
    #[serde(default)]
    pub name: String,
    /// Action parameters.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    /// Transport metadata forwarded by the caller.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl Command {
    /// Look up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

/// Error section of a reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyError {
    pub message: String,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub status: String,
}

impl ReplyError {
    /// Generic internal error with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 0,
            status: ERROR_STATUS.to_string(),
        }
    }
}

/// Reply sent back to the caller.
///
/// Exactly one of `result` and `error` is set. `request_id` echoes the
/// request the reply answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyEnvelope {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
}

impl ReplyEnvelope {
    /// Successful reply carrying `result`.
    pub fn success(request_id: impl Into<String>, result: Value) -> Self {
        Self {
            request_id: request_id.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Error reply with no result.
    pub fn failure(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            result: None,
            error: Some(ReplyError::internal(message)),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Contract data distributed to handlers, keyed by component address.
///
/// Opaque to the reactor: it is replaced wholesale whenever a request
/// carries a schema frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SchemaMapping(BTreeMap<String, Value>);

impl SchemaMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for SchemaMapping {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_fields_default_when_absent() {
        let command: Command = serde_json::from_value(json!({})).unwrap();
        assert_eq!(command, Command::default());

        let command: Command =
            serde_json::from_value(json!({"name": "echo", "params": {"text": "hi"}})).unwrap();
        assert_eq!(command.param("text"), Some(&json!("hi")));
        assert!(command.meta.is_empty());
    }

    #[test]
    fn command_rejects_non_object_payload() {
        assert!(serde_json::from_value::<Command>(json!(["echo"])).is_err());
    }

    #[test]
    fn failure_envelope_omits_result() {
        let value = serde_json::to_value(ReplyEnvelope::failure("r1", "boom")).unwrap();
        assert_eq!(
            value,
            json!({
                "request_id": "r1",
                "error": {"message": "boom", "code": 0, "status": ERROR_STATUS},
            })
        );
    }

    #[test]
    fn schema_mapping_is_transparent_map() {
        let mapping: SchemaMapping =
            serde_json::from_value(json!({"users": {"actions": ["read"]}})).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.keys().collect::<Vec<_>>(), vec!["users"]);
    }
}
