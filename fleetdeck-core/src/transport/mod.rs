//! Transport Seam
//!
//! The store never talks HTTP itself. Every request goes through a
//! [`Transport`], an async request/response capability supplied by the
//! embedding application (a browser fetch wrapper, a native HTTP client, or
//! [`MockTransport`] in tests).
//!
//! Paths passed to the transport are absolute (already carrying the API
//! prefix) and may include a raw query string; URL encoding and timeouts
//! are the transport's business.

mod mock;

pub use mock::{MockTransport, RecordedRequest};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Whether the request mutates server state.
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

/// Structured error body some services attach to a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "errorMsg")]
    pub error_msg: String,
}

/// A failed request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HttpError {
    /// The server answered with a non-success status.
    #[error("request failed with status {status}")]
    Status {
        status: u16,
        body: Option<ErrorBody>,
    },

    /// The request never produced a response.
    #[error("network failure: {0}")]
    Network(String),
}

impl HttpError {
    /// A bare status error with no body.
    pub fn status_only(status: u16) -> Self {
        Self::Status { status, body: None }
    }

    /// A status error carrying a server-supplied message.
    pub fn with_message(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: Some(ErrorBody {
                error_msg: message.into(),
            }),
        }
    }

    /// The response status, if a response arrived at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(_) => None,
        }
    }

    /// The server-supplied `errorMsg`, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status {
                body: Some(body), ..
            } => Some(body.error_msg.as_str()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Async request capability the store depends on.
///
/// Implementations must be shareable across tasks: handlers hold an
/// `Arc<dyn Transport>` and issue requests from spawned continuations.
/// A successful response with no body should be reported as `Value::Null`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, HttpError>;
}
