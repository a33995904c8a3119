//! Scripted transport for tests and local development.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value as JsonValue;

use ssogate_auth::{HttpResponse, HttpTransport, RequestBody, TransportError};

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub body: RequestBody,
}

/// Replays queued responses in order and records every request.
///
/// Once the queue is empty each further call fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Result<HttpResponse, TransportError>) -> &Self {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(response);
        }
        self
    }

    pub fn push_json(&self, status: u16, body: JsonValue) -> &Self {
        self.push(Ok(HttpResponse::new(status, body.to_string())))
    }

    pub fn push_error(&self, message: &str) -> &Self {
        self.push(Err(TransportError(message.to_string())))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or_default()
    }
}

impl HttpTransport for ScriptedTransport {
    fn post(&self, url: &str, body: &RequestBody) -> Result<HttpResponse, TransportError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                url: url.to_string(),
                body: body.clone(),
            });
        }
        self.queue
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| Err(TransportError(format!("no scripted response for {url}"))))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn replays_in_order_then_fails() {
        let transport = ScriptedTransport::new();
        transport.push_json(200, json!({"n": 1})).push_error("reset");

        let first = transport
            .post("https://a.example", &RequestBody::Json(json!([1])))
            .unwrap();
        assert_eq!(first.json().unwrap(), json!({"n": 1}));
        assert_eq!(
            transport.post("https://b.example", &RequestBody::Json(json!([]))),
            Err(TransportError("reset".into()))
        );
        assert!(transport
            .post("https://c.example", &RequestBody::Json(json!([])))
            .is_err());

        assert_eq!(transport.request_count(), 3);
        assert_eq!(transport.requests()[1].url, "https://b.example");
        assert_eq!(transport.pending(), 0);
    }
}
