//! JSON-RPC message classification (§4.2).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// A JSON-RPC request id: integer or string, preserved verbatim (§3, §6.2).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    Str(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::Str(s) => write!(f, "{s}"),
        }
    }
}

/// A classified inbound or outbound message (§3).
#[derive(Debug, Clone)]
pub enum Message {
    Request {
        id: RequestId,
        method: String,
        params: Option<Value>,
    },
    Response {
        id: RequestId,
        result: Value,
    },
    ErrorResponse {
        id: RequestId,
        error: ProtocolError,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("unsupported jsonrpc version")]
    WrongVersion,
    #[error("message matches neither request, response, nor notification shape")]
    Malformed,
}

/// Classifies a parsed JSON value per §4.2.
pub fn classify(value: Value) -> Result<Message, ClassifyError> {
    let obj = value.as_object().ok_or(ClassifyError::Malformed)?;

    match obj.get("jsonrpc").and_then(Value::as_str) {
        Some("2.0") => {}
        _ => return Err(ClassifyError::WrongVersion),
    }

    let id = obj.get("id").cloned();
    let method = obj.get("method").and_then(Value::as_str).map(str::to_owned);
    let has_result = obj.contains_key("result");
    let has_error = obj.contains_key("error");

    match (id, method, has_result, has_error) {
        (Some(id), Some(method), _, _) => Ok(Message::Request {
            id: parse_id(id)?,
            method,
            params: obj.get("params").cloned(),
        }),
        (Some(id), None, true, false) => Ok(Message::Response {
            id: parse_id(id)?,
            result: obj.get("result").cloned().unwrap_or(Value::Null),
        }),
        (Some(id), None, false, true) => {
            let error: ProtocolError = serde_json::from_value(obj.get("error").cloned().unwrap())
                .map_err(|_| ClassifyError::Malformed)?;
            Ok(Message::ErrorResponse {
                id: parse_id(id)?,
                error,
            })
        }
        (None, Some(method), _, _) => Ok(Message::Notification {
            method,
            params: obj.get("params").cloned(),
        }),
        _ => Err(ClassifyError::Malformed),
    }
}

fn parse_id(id: Value) -> Result<RequestId, ClassifyError> {
    serde_json::from_value(id).map_err(|_| ClassifyError::Malformed)
}

/// Builds the wire `Value` for an outbound request.
pub fn build_request(id: &RequestId, method: &str, params: Option<Value>) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("jsonrpc".into(), Value::String("2.0".into()));
    obj.insert("id".into(), serde_json::to_value(id).unwrap());
    obj.insert("method".into(), Value::String(method.into()));
    if let Some(params) = params {
        obj.insert("params".into(), params);
    }
    Value::Object(obj)
}

/// Builds the wire `Value` for an outbound notification.
pub fn build_notification(method: &str, params: Option<Value>) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("jsonrpc".into(), Value::String("2.0".into()));
    obj.insert("method".into(), Value::String(method.into()));
    if let Some(params) = params {
        obj.insert("params".into(), params);
    }
    Value::Object(obj)
}

/// Builds the wire `Value` for an outbound success response.
pub fn build_response(id: &RequestId, result: Value) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("jsonrpc".into(), Value::String("2.0".into()));
    obj.insert("id".into(), serde_json::to_value(id).unwrap());
    obj.insert("result".into(), result);
    Value::Object(obj)
}

/// Builds the wire `Value` for an outbound error response.
pub fn build_error_response(id: &RequestId, error: &ProtocolError) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("jsonrpc".into(), Value::String("2.0".into()));
    obj.insert("id".into(), serde_json::to_value(id).unwrap());
    obj.insert("error".into(), serde_json::to_value(error).unwrap());
    Value::Object(obj)
}
