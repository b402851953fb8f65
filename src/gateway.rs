//! Invocation contract shared by both functions: the HTTP-like event a gateway
//! hands in and the response object it expects back.

use std::collections::{BTreeMap, HashMap};

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::i18n::Messages;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Options,
    Other(String),
}

impl HttpMethod {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "OPTIONS" => HttpMethod::Options,
            other => HttpMethod::Other(other.to_string()),
        }
    }
}

fn default_method() -> String {
    "GET".into()
}

/// Incoming request as delivered by the function gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    #[serde(default = "default_method")]
    pub http_method: String,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl GatewayEvent {
    pub fn new(method: &str) -> Self {
        Self {
            http_method: method.to_string(),
            query_string_parameters: None,
            headers: None,
            body: None,
            is_base64_encoded: false,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn method(&self) -> HttpMethod {
        HttpMethod::parse(&self.http_method)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|q| q.get(name))
            .map(String::as_str)
    }

    /// Parses the body as JSON. An absent or blank body reads as `{}`.
    pub fn json_body(&self, messages: &Messages) -> Result<Value, AppError> {
        let raw = match self.body.as_deref() {
            Some(b) if !b.trim().is_empty() => b,
            _ => return Ok(Value::Object(Default::default())),
        };

        let decoded;
        let text = if self.is_base64_encoded {
            let bytes = Base64::decode_vec(raw.trim())
                .map_err(|_| AppError::BadRequest(messages.invalid_json.into()))?;
            decoded = String::from_utf8(bytes)
                .map_err(|_| AppError::BadRequest(messages.invalid_json.into()))?;
            decoded.as_str()
        } else {
            raw
        };

        serde_json::from_str(text).map_err(|_| AppError::BadRequest(messages.invalid_json.into()))
    }
}

/// Response object returned to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub is_base64_encoded: bool,
    pub body: String,
}

impl GatewayResponse {
    pub fn body_json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// CORS preflight answer. `allow_headers` lists the request headers the function accepts.
pub fn preflight(allow_headers: &str) -> GatewayResponse {
    let mut headers = BTreeMap::new();
    headers.insert("Access-Control-Allow-Origin".into(), "*".into());
    headers.insert("Access-Control-Allow-Methods".into(), "GET, POST, OPTIONS".into());
    headers.insert("Access-Control-Allow-Headers".into(), allow_headers.into());
    headers.insert("Access-Control-Max-Age".into(), "86400".into());
    GatewayResponse {
        status_code: 200,
        headers,
        is_base64_encoded: false,
        body: String::new(),
    }
}

pub fn json(status: u16, body: Value) -> GatewayResponse {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".into(), "application/json".into());
    headers.insert("Access-Control-Allow-Origin".into(), "*".into());
    GatewayResponse {
        status_code: status,
        headers,
        is_base64_encoded: false,
        body: body.to_string(),
    }
}

/// 200 with `body` serialized as JSON.
pub fn ok<T: Serialize>(body: &T) -> Result<GatewayResponse, AppError> {
    let value = serde_json::to_value(body).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(json(200, value))
}
