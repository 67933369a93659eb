//! Ollama caption client for local vision model inference.
//!
//! Talks to a local Ollama instance via its HTTP API.
//! No authentication required — just needs Ollama running locally.

use super::client::{encode_base64, CaptionClient};
use crate::error::CaptionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ollama client for local vision model inference.
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaClient {
    pub fn new(client: reqwest::Client, endpoint: &str, model: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

/// Ollama /api/generate request body.
#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    images: Vec<String>,
    stream: bool,
}

/// Ollama /api/generate response.
///
/// `response` is optional: a body without it means the model produced no
/// content, which is an empty caption rather than a failure.
#[derive(Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: Option<String>,
}

#[async_trait]
impl CaptionClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn generate_caption(
        &self,
        image: &[u8],
        prompt: &str,
    ) -> Result<String, CaptionError> {
        let url = format!("{}/api/generate", self.endpoint);

        let body = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            images: vec![encode_base64(image)],
            stream: false,
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| CaptionError::Client {
                message: format!("Ollama request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CaptionError::Client {
                message: format!("Ollama HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let ollama_resp: OllamaResponse =
            resp.json().await.map_err(|e| CaptionError::Client {
                message: format!("Failed to parse Ollama response: {e}"),
                status_code: None,
            })?;

        Ok(ollama_resp.response.unwrap_or_default())
    }

    fn timeout(&self) -> Duration {
        // Vision models running locally can be slow
        Duration::from_secs(120)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = OllamaRequest {
            model: "llava:13b".to_string(),
            prompt: "Describe this image.".to_string(),
            images: vec!["QUJD".to_string()],
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "llava:13b");
        assert_eq!(json["images"][0], "QUJD");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_missing_response_field_is_empty_caption() {
        let parsed: OllamaResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.response.unwrap_or_default(), "");
    }

    #[test]
    fn test_response_field_parsed() {
        let parsed: OllamaResponse =
            serde_json::from_str(r#"{"response":"a cat on a mat"}"#).unwrap();
        assert_eq!(parsed.response.unwrap_or_default(), "a cat on a mat");
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = OllamaClient::new(
            reqwest::Client::new(),
            "http://localhost:11434/",
            "llava",
        );
        assert_eq!(client.endpoint, "http://localhost:11434");
    }
}
