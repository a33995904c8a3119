//! Outbound HTTP seam.
//!
//! The engine only ever POSTs and reads a JSON body back; concrete clients
//! (blocking `reqwest`, scripted fakes) live outside this crate.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Request payload.
#[derive(Clone, PartialEq)]
pub enum RequestBody {
    Json(JsonValue),
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
}

impl core::fmt::Debug for RequestBody {
    // Form bodies carry the client secret; print keys only.
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RequestBody::Json(v) => f.debug_tuple("Json").field(v).finish(),
            RequestBody::Form(pairs) => f
                .debug_tuple("Form")
                .field(&pairs.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>())
                .finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<JsonValue, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Blocking POST client.
///
/// Timeouts and any retry policy belong to the implementation; callers treat
/// every `Err` as terminal.
pub trait HttpTransport: Send + Sync {
    fn post(&self, url: &str, body: &RequestBody) -> Result<HttpResponse, TransportError>;
}

impl<T> HttpTransport for Arc<T>
where
    T: HttpTransport + ?Sized,
{
    fn post(&self, url: &str, body: &RequestBody) -> Result<HttpResponse, TransportError> {
        (**self).post(url, body)
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays canned responses in order and records what was sent.
    #[derive(Default)]
    pub(crate) struct StubTransport {
        responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
        pub(crate) sent: Mutex<Vec<(String, RequestBody)>>,
    }

    impl StubTransport {
        pub(crate) fn silent() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub(crate) fn replying(
            responses: impl IntoIterator<Item = Result<HttpResponse, TransportError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().collect()),
                sent: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl HttpTransport for StubTransport {
        fn post(&self, url: &str, body: &RequestBody) -> Result<HttpResponse, TransportError> {
            self.sent
                .lock()
                .unwrap()
                .push((url.to_string(), body.clone()));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("no scripted response".into())))
        }
    }
}
