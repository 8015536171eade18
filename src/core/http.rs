use std::time::Duration;

use reqwest::{
    header::{
        HeaderMap,
        HeaderValue,
        USER_AGENT,
    },
    Client,
    StatusCode,
};
use serde::Deserialize;

use crate::core::AffinityError;

pub fn http_client(timeout: Duration) -> Result<Client, AffinityError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("affinity/0.1 (+reqwest)"));

    let client = Client::builder().timeout(timeout).default_headers(headers).build()?;
    Ok(client)
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Pull the server's `detail` out of an error body.
///
/// `detail` is normally a string; validation errors may send a structured value,
/// which is passed through as compact JSON.
pub fn error_detail(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorBody>(body).ok().and_then(|b| b.detail);
    match detail {
        Some(serde_json::Value::String(text)) if !text.trim().is_empty() => text,
        Some(serde_json::Value::Null) | None => format!("HTTP error {}", status.as_u16()),
        Some(serde_json::Value::String(_)) => format!("HTTP error {}", status.as_u16()),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_uses_server_message() {
        let body = r#"{"detail": "Keyword already exists"}"#;
        assert_eq!(error_detail(StatusCode::BAD_REQUEST, body), "Keyword already exists");
    }

    #[test]
    fn test_error_detail_falls_back_to_status() {
        assert_eq!(error_detail(StatusCode::BAD_GATEWAY, "<html>oops</html>"), "HTTP error 502");
        assert_eq!(error_detail(StatusCode::NOT_FOUND, r#"{"message": "x"}"#), "HTTP error 404");
        assert_eq!(error_detail(StatusCode::BAD_REQUEST, r#"{"detail": "  "}"#), "HTTP error 400");
    }

    #[test]
    fn test_error_detail_structured() {
        let body = r#"{"detail": [{"loc": ["body", "keyword"], "msg": "field required"}]}"#;
        let detail = error_detail(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert!(detail.contains("field required"));
    }
}
