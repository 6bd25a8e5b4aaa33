//! Outbound request descriptor and response type.
//!
//! [`RequestSpec`] is a closed shape so that the pipeline can clone it
//! wholesale and replay it with a new bearer token.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::{InvalidInputError, ProtocolError, TransportError};

/// HTTP method of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(InvalidInputError::Other {
                message: format!("unsupported HTTP method '{}'", s),
            }
            .into()),
        }
    }
}

/// A request to the API, relative to the configured base URL.
///
/// # Example
///
/// ```
/// use authwire_core::{Method, RequestSpec};
/// use serde_json::json;
///
/// let request = RequestSpec::post("/files")
///     .unwrap()
///     .with_query("overwrite", "true")
///     .with_json(json!({"name": "notes.txt"}));
/// assert_eq!(request.method(), Method::Post);
/// assert_eq!(request.path(), "/files");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl RequestSpec {
    /// Create a request, validating the path.
    ///
    /// The path must be absolute (start with `/`) and must not carry a
    /// query string or scheme; use [`RequestSpec::with_query`] instead.
    pub fn new(method: Method, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(InvalidInputError::Path {
                value: path,
                reason: "must start with '/'".to_string(),
            }
            .into());
        }
        if path.contains('?') || path.contains('#') {
            return Err(InvalidInputError::Path {
                value: path,
                reason: "query and fragment must be supplied separately".to_string(),
            }
            .into());
        }

        Ok(Self {
            method,
            path,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        })
    }

    pub fn get(path: impl Into<String>) -> Result<Self> {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Result<Self> {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Result<Self> {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Result<Self> {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Result<Self> {
        Self::new(Method::Delete, path)
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append a header. `Authorization` is owned by the pipeline and is
    /// replaced on send.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a JSON body.
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize a value as the JSON body.
    pub fn with_body<T: Serialize>(self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| InvalidInputError::Other {
            message: format!("unserializable request body: {}", e),
        })?;
        Ok(self.with_json(value))
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }
}

/// A response as received from the transport, before classification.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Build a response with a JSON body. Mostly useful for fakes.
    pub fn json_body(status: u16, body: &serde_json::Value) -> Self {
        Self::new(
            status,
            vec![("content-type".to_string(), "application/json".to_string())],
            body.to_string().into_bytes(),
        )
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Look up a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// The body as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            TransportError::Body {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Interpret this response as an error.
    ///
    /// Error bodies of the form `{"error": ..., "message": ...}` are parsed;
    /// `message` may be a string or an array of strings. Any other body is
    /// ignored and only the status is reported.
    pub fn to_protocol_error(&self) -> ProtocolError {
        match serde_json::from_slice::<ErrorBody>(&self.body) {
            Ok(body) => ProtocolError::new(
                self.status,
                body.error,
                body.message.and_then(render_message),
            ),
            Err(_) => ProtocolError::new(self.status, None, None),
        }
    }
}

/// Wire format of an error response.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<serde_json::Value>,
}

fn render_message(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
