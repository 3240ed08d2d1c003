//! # overture-client
//!
//! The request side of overture: validates fetches, dispatches them through
//! an injected transport, drives the wire layer, classifies every failure
//! into the closed [`overture_core::ChatResponse`] taxonomy, and applies the
//! two bounded retry policies (content-filter retry, stale-marker retry).
//!
//! Collaborators (transport, endpoint serializer, tokenizer, reasoning
//! store, telemetry sink) are injected; this crate implements none of the
//! physical transport beyond the optional reqwest-backed [`HttpTransport`]
//! (feature `http`).

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod classify;
pub mod failure;
pub mod fetcher;
pub mod marker;
pub mod mock;
pub mod options;
pub mod repetition;
pub mod serializer;
pub mod telemetry;
pub mod tokenizer;
pub mod transport;

#[cfg(feature = "http")]
pub mod http;

pub use classify::classify_failure;
pub use failure::FetchFailure;
pub use fetcher::{ChatFetcher, FetcherConfig};
pub use marker::{resolve_marker, MarkerAnchor};
pub use mock::{sse_body, MockTransport};
pub use options::{DeltaCallback, FetchOptions};
pub use repetition::{is_repetitive, RepetitionConfig};
pub use serializer::{EndpointSerializer, RequestContext, ResponsesSerializer};
pub use telemetry::{NoopTelemetry, RecordingTelemetry, TelemetryEvent, TelemetrySink};
pub use tokenizer::{ApproxTokenizer, Tokenizer};
pub use transport::{ByteStream, Transport, TransportResponse};

#[cfg(feature = "http")]
pub use http::HttpTransport;
