//! The Error Taxonomy Mapper.
//!
//! Pure mapping from [`FetchFailure`] to the closed [`ChatResponse`]
//! taxonomy, by priority of specificity: explicit cancellation signals
//! always win; structured kinds map 1:1; anything unrecognized falls
//! through to `Failed` with the raw reason preserved. No I/O, no retries.

use overture_core::ChatResponse;
use tokio_util::sync::CancellationToken;

use crate::failure::FetchFailure;

/// Map a structured failure to its caller-facing outcome.
#[must_use]
pub fn classify_failure(
    failure: &FetchFailure,
    request_id: &str,
    cancel: &CancellationToken,
) -> ChatResponse {
    let request_id = request_id.to_string();

    // Cancellation wins regardless of any other condition.
    if cancel.is_cancelled() || failure.is_cancellation() {
        return ChatResponse::Canceled {
            request_id,
            reason: failure.to_string(),
        };
    }

    match failure {
        FetchFailure::RateLimited { retry_after } => ChatResponse::RateLimited {
            request_id,
            retry_after: *retry_after,
            reason: failure.to_string(),
        },
        FetchFailure::QuotaExceeded { reason } => ChatResponse::QuotaExceeded {
            request_id,
            reason: reason.clone(),
        },
        FetchFailure::OffTopic => ChatResponse::OffTopic {
            request_id,
            reason: failure.to_string(),
        },
        FetchFailure::BadRequest { reason } => ChatResponse::BadRequest {
            request_id,
            reason: reason.clone(),
        },
        FetchFailure::PromptFiltered { reason } => ChatResponse::PromptFiltered {
            request_id,
            reason: reason.clone(),
        },
        FetchFailure::AgentUnauthorized { auth_url } => ChatResponse::AgentUnauthorized {
            request_id,
            auth_url: auth_url.clone(),
            reason: failure.to_string(),
        },
        FetchFailure::AgentFailedDependency { reason } => ChatResponse::AgentFailedDependency {
            request_id,
            reason: reason.clone(),
        },
        FetchFailure::ExtensionBlocked {
            retry_after,
            learn_more,
        } => ChatResponse::ExtensionBlocked {
            request_id,
            retry_after: *retry_after,
            learn_more: learn_more.clone(),
            reason: failure.to_string(),
        },
        FetchFailure::NotFound { reason } => ChatResponse::NotFound {
            request_id,
            reason: reason.clone(),
        },
        FetchFailure::InvalidStatefulMarker => ChatResponse::InvalidStatefulMarker {
            request_id,
            reason: failure.to_string(),
        },
        FetchFailure::NetworkError { reason } => ChatResponse::NetworkError {
            request_id,
            reason: reason.clone(),
        },
        FetchFailure::Other(reason) => ChatResponse::Failed {
            request_id,
            reason: reason.clone(),
            error: None,
        },
        // is_cancellation() handled above.
        FetchFailure::Aborted | FetchFailure::PrematureClose => unreachable!(),
    }
}
