//! Mapping of Drive HTTP failures onto [`ObjectStoreError`]
//!
//! Drive reports quota and rate limiting as 403 with a `reason` in the
//! JSON error body, so the status code alone is not enough.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::warn;

use seedup_core::ports::ObjectStoreError;

/// Fallback when a 429 carries no usable `Retry-After`
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Parses a `Retry-After` value (delta seconds or HTTP-date)
///
/// Dates more than an hour away, or in the past, fall back to `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let diff = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
        if let Some(secs) = u64::try_from(diff.num_seconds())
            .ok()
            .filter(|&s| s > 0 && s <= 3600)
        {
            return Duration::from_secs(secs);
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

/// Classifies a transport failure (no HTTP response)
pub fn from_transport(err: reqwest::Error) -> ObjectStoreError {
    if err.is_timeout() {
        ObjectStoreError::Timeout
    } else if err.is_decode() {
        ObjectStoreError::InvalidResponse(err.to_string())
    } else {
        ObjectStoreError::Network(err.to_string())
    }
}

/// Classifies a status code and error body
pub fn classify(status: StatusCode, retry_after: Option<Duration>, body: &str) -> ObjectStoreError {
    let (message, reasons): (String, Vec<String>) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => (
            env.error.message,
            env.error.errors.into_iter().map(|e| e.reason).collect(),
        ),
        Err(_) => (body.trim().to_string(), Vec::new()),
    };
    let has_reason = |wanted: &[&str]| reasons.iter().any(|r| wanted.contains(&r.as_str()));

    match status.as_u16() {
        401 => ObjectStoreError::Unauthorized(message),
        403 if has_reason(&["storageQuotaExceeded", "quotaExceeded"]) => {
            ObjectStoreError::QuotaExceeded(message)
        }
        403 if has_reason(&["userRateLimitExceeded", "rateLimitExceeded"]) => {
            ObjectStoreError::TooManyRequests { retry_after }
        }
        403 => ObjectStoreError::Forbidden(message),
        404 => ObjectStoreError::NotFound(message),
        408 => ObjectStoreError::Timeout,
        429 => ObjectStoreError::TooManyRequests {
            retry_after: Some(retry_after.unwrap_or(DEFAULT_RETRY_AFTER)),
        },
        code @ 500..=599 => ObjectStoreError::Server {
            status: code,
            message,
        },
        code => ObjectStoreError::InvalidRequest(format!("HTTP {code}: {message}")),
    }
}

/// Consumes an unsuccessful response and classifies it
pub async fn from_response(response: Response) -> ObjectStoreError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER));
    let body = response.text().await.unwrap_or_default();
    classify(status, retry_after, &body)
}
