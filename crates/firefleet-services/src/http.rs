//! Shared HTTP plumbing for the service clients.

use anyhow::{Context, Result};
use firefleet_core::ServiceError;
use reqwest::{Client, Response};
use std::time::Duration;

/// Upper bound on how much of an error body is kept in a [`ServiceError`].
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn build_client(timeout: Duration, user_agent: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder().timeout(timeout);
    if let Some(agent) = user_agent {
        builder = builder.user_agent(agent.to_string());
    }
    builder.build().context("Failed to create HTTP client")
}

pub(crate) fn transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Transport(format!("timed out: {}", err))
    } else {
        ServiceError::Transport(err.to_string())
    }
}

/// Body of a successful response, or the status and (truncated) body of a failed one.
pub(crate) async fn success_body(response: Response) -> Result<String, ServiceError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if !status.is_success() {
        return Err(ServiceError::Status {
            status: status.as_u16(),
            body: truncate(&body, MAX_ERROR_BODY),
        });
    }
    Ok(body)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
