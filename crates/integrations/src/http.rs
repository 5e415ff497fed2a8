use std::time::Duration;

use pawtrip_core::ServiceError;
use reqwest::{Client, Response};

const ERROR_BODY_LIMIT: usize = 300;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, ServiceError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| ServiceError::Network(error.to_string()))
}

pub(crate) fn map_transport_error(error: reqwest::Error, timeout: Duration) -> ServiceError {
    if error.is_timeout() {
        ServiceError::Timeout(timeout)
    } else if error.is_decode() {
        ServiceError::InvalidResponse(error.to_string())
    } else {
        ServiceError::Network(error.to_string())
    }
}

/// Turns a non-success status into `ServiceError::Http` with a trimmed body.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::http(status.as_u16(), truncate(&body, ERROR_BODY_LIMIT)))
}

pub(crate) fn truncate(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        input.to_string()
    } else {
        input.chars().take(max_chars).collect::<String>() + "..."
    }
}
