use crate::constants::JSONRPC_VERSION;
use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A uniquely identifying ID for a request in JSON-RPC
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

/// A request that expects a response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JSONRPCRequest {
    pub fn new(id: RequestId, method: String, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method,
            params,
        }
    }
}

/// A notification which does not expect a response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JSONRPCNotification {
    pub fn new(method: String, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method,
            params,
        }
    }
}

/// A successful (non-error) response to a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Value,
}

impl JSONRPCResponse {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        }
    }
}

/// Error details carried by a [`JSONRPCError`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A response to a request that indicates an error occurred
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCError {
    pub jsonrpc: String,
    pub id: RequestId,
    pub error: ErrorObject,
}

impl JSONRPCError {
    pub fn new(id: RequestId, code: i32, message: String) -> Self {
        Self::new_with_details(id, code, message, None)
    }

    pub fn new_with_details(id: RequestId, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: ErrorObject {
                code,
                message,
                data,
            },
        }
    }
}

/// Any JSON-RPC message that can travel over a transport
///
/// Decoding picks the variant from the keys present. A message with both
/// `method` and `id` is always a request, so one whose `id` is not a valid
/// [`RequestId`] (null, fractional, out of range) fails to decode instead of
/// passing as a notification.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JSONRPCMessage {
    Request(JSONRPCRequest),
    Notification(JSONRPCNotification),
    Response(JSONRPCResponse),
    Error(JSONRPCError),
}

impl<'de> Deserialize<'de> for JSONRPCMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let (has_method, has_id, has_error) = match value.as_object() {
            Some(object) => (
                object.contains_key("method"),
                object.contains_key("id"),
                object.contains_key("error"),
            ),
            None => return Err(D::Error::custom("JSON-RPC message must be an object")),
        };

        let message = match (has_method, has_id) {
            (true, true) => serde_json::from_value(value).map(JSONRPCMessage::Request),
            (true, false) => serde_json::from_value(value).map(JSONRPCMessage::Notification),
            _ if has_error => serde_json::from_value(value).map(JSONRPCMessage::Error),
            _ => serde_json::from_value(value).map(JSONRPCMessage::Response),
        };
        message.map_err(D::Error::custom)
    }
}
