use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;
use std::time::Duration;

use crate::error::{RagError, Result};

/// Blocking JSON client shared by the embedding and chat backends.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn post_json<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T> {
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .map_err(|e| classify(url, e))?;
        let status = resp.status();
        let text = resp.text().map_err(|e| classify(url, e))?;
        if !status.is_success() {
            return Err(status_error(url, status, text));
        }
        Ok(from_str::<T>(&text)?)
    }
}

fn classify(url: &str, err: reqwest::Error) -> RagError {
    if err.is_timeout() {
        RagError::Timeout {
            url: url.to_string(),
        }
    } else {
        RagError::Http(err)
    }
}

fn status_error(url: &str, status: StatusCode, body: String) -> RagError {
    if status == StatusCode::NOT_FOUND {
        if let Some(model) = missing_model(&body) {
            return RagError::ModelNotFound { model };
        }
    }
    RagError::HttpStatus {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    }
}

/// Ollama reports unknown models as `{"error":"model \"x\" not found, try pulling it first"}`.
fn missing_model(body: &str) -> Option<String> {
    let value: serde_json::Value = from_str(body).ok()?;
    let msg = value.get("error")?.as_str()?;
    if !msg.contains("not found") {
        return None;
    }
    let name = msg
        .split(['"', '\''])
        .nth(1)
        .unwrap_or(msg)
        .to_string();
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_model_name_from_not_found_body() {
        let body = r#"{"error":"model \"llama9\" not found, try pulling it first"}"#;
        assert_eq!(missing_model(body).as_deref(), Some("llama9"));
    }

    #[test]
    fn not_found_without_model_message_stays_status_error() {
        let err = status_error("http://x/api/chat", StatusCode::NOT_FOUND, "404 page".into());
        assert!(matches!(err, RagError::HttpStatus { status: 404, .. }));
    }
}
