//! Scripted mock transport for tests.
//!
//! Queue responses in order; each `send` pops the next one. Bodies are
//! delivered as small byte chunks so frame reassembly is exercised, and
//! every request body is recorded for assertions.

use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::failure::FetchFailure;
use crate::transport::{Transport, TransportResponse};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Open a stream delivering `body`, then close it.
    Stream {
        /// Raw frame-protocol body.
        body: String,
        /// Server-assigned request id header.
        server_request_id: Option<String>,
    },
    /// Fail before any bytes arrive.
    Failure(FetchFailure),
    /// Deliver `body`, then fail the stream mid-flight.
    StreamThenFailure {
        /// Raw frame-protocol body delivered first.
        body: String,
        /// Failure raised after the body.
        failure: FetchFailure,
    },
}

/// Transport that replays a script.
#[derive(Debug)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<serde_json::Value>>,
    chunk_size: usize,
}

impl MockTransport {
    /// Create an empty mock; unscripted sends fail.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            chunk_size: 7,
        }
    }

    /// Queue a successful stream.
    #[must_use]
    pub fn stream(self, body: impl Into<String>) -> Self {
        self.script.lock().push_back(Scripted::Stream {
            body: body.into(),
            server_request_id: None,
        });
        self
    }

    /// Queue a pre-stream failure.
    #[must_use]
    pub fn failure(self, failure: FetchFailure) -> Self {
        self.script.lock().push_back(Scripted::Failure(failure));
        self
    }

    /// Queue a stream that fails mid-flight after `body`.
    #[must_use]
    pub fn stream_then_failure(self, body: impl Into<String>, failure: FetchFailure) -> Self {
        self.script.lock().push_back(Scripted::StreamThenFailure {
            body: body.into(),
            failure,
        });
        self
    }

    /// Number of sends observed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Recorded request bodies, in order.
    #[must_use]
    pub fn request_bodies(&self) -> Vec<serde_json::Value> {
        self.requests.lock().clone()
    }

    fn chunked(&self, body: &str) -> Vec<Result<Bytes, FetchFailure>> {
        debug_assert!(self.chunk_size > 0);
        body.as_bytes()
            .chunks(self.chunk_size)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a frame-protocol body from `(event, data)` pairs.
#[must_use]
pub fn sse_body(events: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (event, data) in events {
        body.push_str(&format!("event: {event}\ndata: {data}\n\n"));
    }
    body
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        body: serde_json::Value,
        _request_id: &str,
        _cancel: &CancellationToken,
    ) -> Result<TransportResponse, FetchFailure> {
        self.requests.lock().push(body);

        let scripted = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(Scripted::Failure(FetchFailure::Other(
                "unscripted request".into(),
            )));

        match scripted {
            Scripted::Stream {
                body,
                server_request_id,
            } => {
                let chunks = self.chunked(&body);
                let mut response = TransportResponse::new(Box::pin(stream::iter(chunks)));
                response.server_request_id = server_request_id;
                Ok(response)
            }
            Scripted::Failure(failure) => Err(failure),
            Scripted::StreamThenFailure { body, failure } => {
                let mut chunks = self.chunked(&body);
                chunks.push(Err(failure));
                Ok(TransportResponse::new(Box::pin(stream::iter(chunks))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_scripted_stream_replays_in_chunks() {
        let transport = MockTransport::new().stream(sse_body(&[("e", "payload")]));
        let cancel = CancellationToken::new();
        let response = transport
            .send(serde_json::json!({}), "req_1", &cancel)
            .await
            .unwrap();

        let mut bytes = Vec::new();
        let mut stream = response.stream;
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(bytes, sse_body(&[("e", "payload")]).as_bytes());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_unscripted_send_fails() {
        let transport = MockTransport::new();
        let cancel = CancellationToken::new();
        let err = transport
            .send(serde_json::json!({}), "req_1", &cancel)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, FetchFailure::Other(_)));
    }
}
