//! # overture
//!
//! A streaming chat-completion client. overture speaks the line-oriented
//! `event:`/`data:` streaming protocol of a chat endpoint, normalizes its
//! frames into typed deltas, assembles terminal completions, classifies
//! every way a fetch can end into one closed outcome taxonomy, and applies
//! exactly two bounded one-shot retries (content filter, stale conversation
//! marker).
//!
//! ## Quick Start
//!
//! ```ignore
//! use overture::prelude::*;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = Arc::new(HttpTransport::new("https://api.example.com/v1/responses")
//!         .with_api_key(std::env::var("API_KEY").unwrap_or_default()));
//!     let fetcher = ChatFetcher::new(transport, Arc::new(ResponsesSerializer::new()));
//!
//!     let opts = FetchOptions::new("model-x", vec![ChatMessage::user("Hello!")]);
//!     let response = fetcher.fetch_one(opts, &CancellationToken::new()).await;
//!
//!     match response {
//!         ChatResponse::Success { texts, .. } => println!("{}", texts[0]),
//!         other => eprintln!("fetch failed: {:?}", other.reason()),
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! overture is a workspace of focused crates:
//!
//! - [`overture_core`] - messages, deltas, completions, the outcome taxonomy
//! - [`overture_wire`] - frame parser, wire events, the stream processor
//! - [`overture_client`] - orchestration, classification, retries, transports

#![warn(missing_docs)]
#![deny(unsafe_code)]

/// Core types: messages, deltas, completions, outcomes.
pub use overture_core as core;

/// Wire layer: frame parsing and stream processing.
pub use overture_wire as wire;

/// Client layer: orchestration, classification, transports.
pub use overture_client as client;

pub use overture_client::{
    classify_failure, resolve_marker, ChatFetcher, EndpointSerializer, FetchFailure, FetchOptions,
    FetcherConfig, MockTransport, ResponsesSerializer, Transport,
};
pub use overture_core::{
    ChatCompletion, ChatMessage, ChatResponse, ContentPart, ConversationMarker, FetchSettings,
    FinishReason, ResponseDelta, Role, TokenUsage, ToolCall, ToolSpec,
};
pub use overture_wire::{FrameParser, StreamProcessor, WireEvent};

#[cfg(feature = "http")]
pub use overture_client::HttpTransport;

/// Common imports for typical use.
pub mod prelude {
    pub use overture_client::{
        ChatFetcher, DeltaCallback, EndpointSerializer, FetchFailure, FetchOptions, FetcherConfig,
        MockTransport, ResponsesSerializer, TelemetrySink, Tokenizer, Transport,
    };
    pub use overture_core::prelude::*;
    pub use overture_wire::{ReasoningStore, StreamProcessor};

    #[cfg(feature = "http")]
    pub use overture_client::HttpTransport;
}
