use std::time::Duration;

use reqwest::Response;
use reqwest::header::RETRY_AFTER;
use tracing::error;

use crate::error::{RequestFailureKind, Result, TriageError};

/// Convert a reqwest error to a TriageError, keeping timeouts distinct.
pub fn handle_http_error(e: reqwest::Error, provider_name: &str) -> TriageError {
    error!(error = %e, timeout = e.is_timeout(), "HTTP request to {} failed", provider_name);
    TriageError::from(e)
}

/// Check HTTP response status and classify the failure if unsuccessful.
pub async fn check_response_status(response: Response, provider_name: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let error_text = response
        .text()
        .await
        .map_err(|e| handle_http_error(e, provider_name))?;
    error!(
        status = %status,
        error = %error_text,
        "{} API returned error response", provider_name
    );
    Err(TriageError::request_failed(RequestFailureKind::from_status(
        status.as_u16(),
        &error_text,
        retry_after,
    )))
}

/// `Retry-After` in delay-seconds form. HTTP-date values are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
