use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use studio_core::backend::BackendResponse;
use studio_core::error::BackendError;

pub(crate) fn build_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("falling back to default HTTP client: {e}");
            Client::new()
        })
}

/// Send a prepared JSON request and return the raw body of a 2xx answer.
///
/// Non-2xx answers and transport failures are classified; nothing is retried.
pub(crate) async fn send_json(request: RequestBuilder) -> Result<String, BackendError> {
    let resp = request
        .header("Content-Type", "application/json")
        .send()
        .await
        .map_err(|e| classify_transport(&e))?;

    let status = resp.status().as_u16();
    if resp.status().is_success() {
        return resp.text().await.map_err(|e| classify_transport(&e));
    }

    let text = resp.text().await.unwrap_or_default();
    Err(classify_status(status, &text))
}

/// Decode a 2xx body. A body that is not JSON still counts as an answer, just
/// one without a usable result.
pub(crate) fn decode_body(body: &str) -> Result<serde_json::Value, BackendResponse> {
    serde_json::from_str(body).map_err(|e| {
        tracing::warn!("service answered with a non-JSON body: {e}");
        BackendResponse {
            success: true,
            result_reference: None,
            message: Some(format!("unreadable response body: {e}")),
        }
    })
}

pub(crate) fn classify_transport(err: &reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Unavailable(format!("request timed out: {err}"))
    } else {
        BackendError::Unavailable(err.to_string())
    }
}

/// 408, 429 and 5xx are transient; every other failure is the service saying no.
pub fn classify_status(status: u16, body: &str) -> BackendError {
    let message = extract_error_message(body);
    let message = if message.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {message}")
    };

    match status {
        408 | 429 | 500..=599 => BackendError::Unavailable(message),
        _ => BackendError::Rejected(message),
    }
}

/// Pull a human-readable message out of the error shapes fal.ai and Google use.
pub fn extract_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    // Google: {"error": {"message": "..."}}
    if let Some(msg) = value["error"]["message"].as_str() {
        return msg.to_string();
    }
    if let Some(msg) = value["error"].as_str() {
        return msg.to_string();
    }

    // fal.ai: {"detail": "..."} or {"detail": [{"msg": "..."}]}
    match &value["detail"] {
        serde_json::Value::String(s) => return s.clone(),
        serde_json::Value::Array(items) => {
            let msgs: Vec<&str> = items.iter().filter_map(|i| i["msg"].as_str()).collect();
            if !msgs.is_empty() {
                return msgs.join("; ");
            }
        }
        _ => {}
    }

    if let Some(msg) = value["message"].as_str() {
        return msg.to_string();
    }

    body.trim().to_string()
}
