//! The shared request helper.
//!
//! Every CRUD operation of every resource goes through [`ApiClient::request`]:
//! one HTTP call carrying the service key header, a status check, and the raw
//! body handed back to the caller.

use reqwest::{header, Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::ProviderConfig;
use crate::error::ProviderError;

/// Header carrying the service key.
pub const SERVICE_KEY_HEADER: &str = "servicekey";

const USER_AGENT: &str = concat!("hemmer-provider-logdna/", env!("CARGO_PKG_VERSION"));

/// Maximum length of a response body written to logs or error messages.
const MAX_LOG_BODY_LENGTH: usize = 200;

fn truncate_body(body: &str) -> String {
    if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    }
}

/// The `error` or `message` field of a JSON error response.
///
/// The API reports failures as `{"error": "...", "code": "...", "status": "error"}`;
/// some endpoints use `message` instead.
fn api_error_text(body: &str) -> Option<String> {
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    ["error", "message"].into_iter().find_map(|field| match obj.get(field) {
        Some(Value::String(msg)) if !msg.is_empty() => Some(msg.clone()),
        _ => None,
    })
}

/// Pull a human-readable message out of an error response.
///
/// JSON bodies without an error field are not echoed, since they may hold
/// the object's secrets.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Some(msg) = api_error_text(body) {
        return msg;
    }
    if body.trim().is_empty() || serde_json::from_str::<Value>(body).is_ok() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        truncate_body(body.trim())
    }
}

/// Remove null-valued object fields, recursively.
pub fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

/// HTTP client for the LogDNA configuration API.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    service_key: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client from resolved provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
        })
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request and return the raw response body.
    pub async fn request<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, ProviderError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "API request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(SERVICE_KEY_HEADER, &self.service_key)
            .header(header::ACCEPT, "application/json");

        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(serde_json::to_vec(body)?);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Bodies may carry keys and passwords; only sizes and API error text are logged.
        if !status.is_success() {
            error!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                bytes = text.len(),
                api_error = api_error_text(&text).as_deref(),
                "API request failed"
            );
            return Err(ProviderError::from_status(
                status.as_u16(),
                error_message(status, &text),
            ));
        }

        debug!(status = status.as_u16(), bytes = text.len(), "API response");
        Ok(text)
    }

    /// Issue one request and decode the response body as `T`.
    ///
    /// An empty body decodes as JSON `null`. Null object fields are dropped
    /// before decoding so response types can rely on `#[serde(default)]`.
    pub async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.request(method, path, body).await?;
        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        let value: Value = serde_json::from_str(&text)?;
        Ok(serde_json::from_value(strip_nulls(value))?)
    }

    /// `GET path`, decoding the response.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        self.send::<(), T>(Method::GET, path, None).await
    }

    /// `POST path` with a JSON body, decoding the response.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Some(body)).await
    }

    /// `PUT path` with a JSON body, decoding the response.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::PUT, path, Some(body)).await
    }

    /// `DELETE path`, discarding the response body.
    pub async fn delete(&self, path: &str) -> Result<(), ProviderError> {
        self.request::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrgType;
    use reqwest::StatusCode;

    #[test]
    fn test_error_message_prefers_error_field() {
        let body = r#"{"error":"Invalid query","code":"BadRequest","status":"error"}"#;
        assert_eq!(error_message(StatusCode::BAD_REQUEST, body), "Invalid query");

        let body = r#"{"message":"Not allowed"}"#;
        assert_eq!(error_message(StatusCode::FORBIDDEN, body), "Not allowed");
    }

    #[test]
    fn test_error_message_falls_back_to_body_or_reason() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
        assert_eq!(
            error_message(StatusCode::CONFLICT, r#"{"id":"k1","key":"secret"}"#),
            "Conflict"
        );
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(500);
        let truncated = truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(truncated.contains("500 bytes total"));

        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let truncated = truncate_body(&body);
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_strip_nulls() {
        let value = serde_json::json!({
            "name": "errors",
            "query": null,
            "channels": [{"emails": null, "integration": "email"}]
        });
        assert_eq!(
            strip_nulls(value),
            serde_json::json!({"name": "errors", "channels": [{"integration": "email"}]})
        );
    }

    #[test]
    fn test_client_strips_trailing_slash() {
        let config = ProviderConfig::new("key", OrgType::Regular).with_url("http://localhost:1234/");
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234");
        assert!(!format!("{:?}", client).contains("key"));
    }
}
