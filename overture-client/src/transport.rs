//! The transport capability consumed by the orchestrator.
//!
//! This core does not implement connection management; it consumes an
//! abstract "send request, get a streamable response" capability. Transient
//! network errors (reset, timeout) are the transport's business to retry
//! exactly once; everything it surfaces here is terminal for the attempt.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::failure::FetchFailure;

/// An abortable stream of response bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, FetchFailure>> + Send>>;

/// A successfully opened streaming response.
pub struct TransportResponse {
    /// Server-assigned request id from the response headers, if any.
    pub server_request_id: Option<String>,
    /// The response byte stream.
    pub stream: ByteStream,
}

impl TransportResponse {
    /// Wrap a byte stream without a server request id.
    #[must_use]
    pub fn new(stream: ByteStream) -> Self {
        Self {
            server_request_id: None,
            stream,
        }
    }

    /// Set the server-assigned request id.
    #[must_use]
    pub fn with_server_request_id(mut self, id: impl Into<String>) -> Self {
        self.server_request_id = Some(id.into());
        self
    }
}

/// Capability to dispatch a serialized request and stream the response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the serialized body; resolve once response headers are in.
    ///
    /// Implementations must abort the underlying connection when `cancel`
    /// fires and release the stream on every exit path.
    async fn send(
        &self,
        body: serde_json::Value,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, FetchFailure>;
}
