//! Mapping of HTTP transport and status failures onto pipeline errors.
//!
//! Shared by the chat clients in this crate and the embedding providers in
//! `policyqa-knowledge`, so both classify retryable failures the same way.

use policyqa_core::{AppError, Stage};
use reqwest::StatusCode;
use std::time::Duration;

/// Build a reqwest client whose every request is bounded by `timeout`.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Classify a failure to send a request or read its body.
///
/// Timeouts and connection failures are transient, and so is anything else
/// that went wrong on the wire. Bodies that arrive intact but do not parse
/// go through [`decode_error`] instead.
pub fn transport_error(stage: Stage, service: &str, err: reqwest::Error) -> AppError {
    let message = if err.is_timeout() {
        format!("{} request timed out: {}", service, err)
    } else if err.is_connect() {
        format!("failed to connect to {}: {}", service, err)
    } else {
        format!("{} request failed: {}", service, err)
    };
    AppError::transient(stage, message)
}

/// Classify a response body that arrived but could not be decoded.
///
/// Retrying would get the same unusable reply, so this is never transient.
pub fn decode_error(stage: Stage, service: &str, err: impl std::fmt::Display) -> AppError {
    AppError::invalid_input(stage, format!("{} returned an unreadable response: {}", service, err))
}

/// Classify a non-success HTTP status.
///
/// 408, 429 and 5xx are retryable; any other status means the request must
/// change before it can succeed.
pub fn status_error(stage: Stage, service: &str, status: StatusCode, body: &str) -> AppError {
    let message = format!("{} API error ({}): {}", service, status, body.trim());
    if is_retryable_status(status) {
        AppError::transient(stage, message)
    } else {
        AppError::invalid_input(stage, message)
    }
}

/// Classify a non-success status from a chat endpoint.
///
/// Non-retryable chat failures surface as [`AppError::GenerationFailed`].
pub fn chat_status_error(service: &str, status: StatusCode, body: &str) -> AppError {
    match status_error(Stage::Generation, service, status, body) {
        AppError::InvalidInput { message, .. } => AppError::GenerationFailed(message),
        other => other,
    }
}

/// Whether a status code signals a retryable condition.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_status_error_kinds() {
        let err = status_error(
            Stage::Embedding,
            "OpenAI",
            StatusCode::TOO_MANY_REQUESTS,
            "rate limited",
        );
        assert!(err.is_retryable());
        assert_eq!(err.stage(), Some(Stage::Embedding));

        let err = status_error(
            Stage::Embedding,
            "OpenAI",
            StatusCode::BAD_REQUEST,
            "maximum context length exceeded",
        );
        assert!(matches!(err, AppError::InvalidInput { .. }));
        assert!(err.to_string().contains("maximum context length"));
    }

    #[test]
    fn test_decode_error_is_not_retryable() {
        let err = decode_error(Stage::Embedding, "Ollama embeddings", "expected value at line 1");
        assert!(!err.is_retryable());
        assert!(matches!(
            err,
            AppError::InvalidInput {
                stage: Stage::Embedding,
                ..
            }
        ));
    }

    #[test]
    fn test_chat_status_error_kinds() {
        let err = chat_status_error("Ollama", StatusCode::NOT_FOUND, "model not found");
        assert!(matches!(err, AppError::GenerationFailed(_)));

        let err = chat_status_error("Ollama", StatusCode::SERVICE_UNAVAILABLE, "busy");
        assert!(err.is_retryable());
        assert_eq!(err.stage(), Some(Stage::Generation));
    }
}
