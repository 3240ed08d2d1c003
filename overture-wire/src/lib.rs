//! # overture-wire
//!
//! The wire layer of overture: turns the raw byte stream of the chat
//! endpoint's line-oriented streaming protocol into normalized deltas and a
//! terminal completion.
//!
//! - [`frame`]: splits arbitrary byte chunks into `event:`/`data:` frames
//! - [`event`]: the sealed union of recognized wire events
//! - [`processor`]: the per-request state machine producing [`overture_core::ResponseDelta`]s
//! - [`store`]: the reasoning-text store the processor persists into

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod event;
pub mod frame;
pub mod processor;
pub mod store;

pub use error::{WireError, WireResult};
pub use event::WireEvent;
pub use frame::{Frame, FrameParser, FrameStream};
pub use processor::{Step, StreamProcessor};
pub use store::{InMemoryReasoningStore, ReasoningStore};
