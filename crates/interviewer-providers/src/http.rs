//! HTTP status and transport error mapping shared by the remote backends.

use interviewer_core::error::GatewayError;

/// Map a transport failure to a [`GatewayError`].
pub(crate) fn send_error(e: reqwest::Error, timeout_secs: u64, base_url: &str) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout(timeout_secs)
    } else if e.is_connect() {
        GatewayError::NetworkError(format!("{base_url} not reachable: {e}"))
    } else {
        GatewayError::NetworkError(e.to_string())
    }
}

/// Pass successful responses through; turn error statuses into [`GatewayError`]s.
///
/// `extract_message` pulls a human-readable message out of a provider's JSON
/// error body; the raw body is used when it returns `None`.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
    extract_message: fn(&str) -> Option<String>,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5)
            * 1000;
        return Err(GatewayError::RateLimited {
            retry_after_ms: retry_after,
        });
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_message(&body).unwrap_or(body);
    Err(match status {
        401 | 403 => GatewayError::AuthenticationFailed(message),
        404 => GatewayError::ModelNotFound(model.to_string()),
        _ => GatewayError::ApiError { status, message },
    })
}

/// Extracts `error.message` from `{"error": {"message": ...}}` bodies.
pub(crate) fn nested_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match &value["error"] {
        serde_json::Value::String(s) => Some(s.clone()),
        other => other["message"].as_str().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_messages() {
        assert_eq!(
            nested_error_message(r#"{"error": {"message": "bad model"}}"#).as_deref(),
            Some("bad model")
        );
        assert_eq!(
            nested_error_message(r#"{"error": "model not found"}"#).as_deref(),
            Some("model not found")
        );
        assert_eq!(nested_error_message("plain text"), None);
    }
}
