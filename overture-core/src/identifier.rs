//! ID generation utilities.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a unique request id.
///
/// ```rust
/// let id = overture_core::generate_request_id();
/// assert!(id.starts_with("req_"));
/// ```
#[must_use]
pub fn generate_request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}

/// Current UTC timestamp.
#[must_use]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}
