//! Fire-and-forget telemetry sink.
//!
//! Only the fact that events are emitted matters to this crate; their
//! downstream schema is a consumer concern.

use parking_lot::Mutex;

/// One structured telemetry event.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryEvent {
    /// Event name (e.g. `time_to_first_token_ms`).
    pub name: &'static str,
    /// Request the event belongs to.
    pub request_id: String,
    /// Numeric value.
    pub value: f64,
}

impl TelemetryEvent {
    /// Create an event.
    #[must_use]
    pub fn new(name: &'static str, request_id: impl Into<String>, value: f64) -> Self {
        Self {
            name,
            request_id: request_id.into(),
            value,
        }
    }
}

/// Sink accepting fire-and-forget events. Not required for correctness.
pub trait TelemetrySink: Send + Sync {
    /// Emit one event.
    fn emit(&self, event: TelemetryEvent);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn emit(&self, _event: TelemetryEvent) {}
}

/// Sink that records events, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }

    /// Events with the given name.
    #[must_use]
    pub fn named(&self, name: &str) -> Vec<TelemetryEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.name == name)
            .cloned()
            .collect()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn emit(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}
