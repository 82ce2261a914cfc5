//! Scripted in-memory transport.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{HttpError, Method, Transport};

/// One request seen by a [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// A [`Transport`] that answers from a script and records every request.
///
/// Responses are keyed by method and full path (query string included).
/// A scripted response is reused for every matching request until it is
/// replaced. Unscripted requests fail with a bare 404, which is what an
/// existence probe expects for an absent resource.
///
/// # Example
///
/// ```rust,ignore
/// let transport = Arc::new(MockTransport::new());
/// transport.respond(Method::Get, "/api/v1/devices", Ok(json!([])));
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<(Method, String), Result<Value, HttpError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response for `method path`.
    pub fn respond(
        &self,
        method: Method,
        path: impl Into<String>,
        response: Result<Value, HttpError>,
    ) {
        self.responses.lock().insert((method, path.into()), response);
    }

    /// Every request issued so far, in issue order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of times `method path` was requested.
    pub fn request_count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn was_requested(&self, method: Method, path: &str) -> bool {
        self.request_count(method, path) > 0
    }

    /// Whether any mutating request was issued.
    pub fn any_writes(&self) -> bool {
        self.requests.lock().iter().any(|r| r.method.is_write())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, HttpError> {
        self.requests.lock().push(RecordedRequest {
            method,
            path: path.to_string(),
            body,
        });

        let response = self
            .responses
            .lock()
            .get(&(method, path.to_string()))
            .cloned()
            .unwrap_or_else(|| Err(HttpError::status_only(404)));

        // A real request always suspends at least once.
        tokio::task::yield_now().await;
        response
    }
}
