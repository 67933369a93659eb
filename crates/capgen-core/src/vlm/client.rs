//! Caption service client trait and the factory that builds one per endpoint.

use crate::config::Endpoint;
use crate::error::CaptionError;
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

/// Trait all caption service clients implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn CaptionClient>` for dynamic dispatch).
#[async_trait]
pub trait CaptionClient: Send + Sync {
    /// Client name for logging (e.g., "ollama").
    fn name(&self) -> &str;

    /// Check whether the backend is reachable.
    async fn is_available(&self) -> bool;

    /// Generate a caption for the given image bytes and prompt.
    ///
    /// Transport, HTTP-status, and malformed-body conditions fail with
    /// `CaptionError::Client`. A response the backend parsed but left empty
    /// is a successful empty caption, never an error.
    async fn generate_caption(&self, image: &[u8], prompt: &str)
        -> Result<String, CaptionError>;

    /// Per-request timeout for this client.
    fn timeout(&self) -> Duration;
}

/// Sniff the MIME type from the image's magic bytes.
///
/// Items only ever carry jpg/jpeg/png/bmp, so unknown content falls back to
/// JPEG rather than failing.
pub fn sniff_media_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        "image/jpeg"
    } else if bytes.starts_with(&[0x42, 0x4D]) {
        "image/bmp"
    } else {
        "image/jpeg"
    }
}

/// Base64-encode image bytes.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Build a data URL suitable for OpenAI-style APIs.
pub fn data_url(bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        sniff_media_type(bytes),
        encode_base64(bytes)
    )
}

/// Build the right client for an endpoint binding.
///
/// The HTTP client is constructed by the caller and injected; clients never
/// reach for process-wide shared state. Selection happens once at batch
/// start, not per item.
pub fn build_client(endpoint: &Endpoint, http: reqwest::Client) -> Box<dyn CaptionClient> {
    if endpoint.provider.is_openai_compatible() {
        Box::new(super::openai::OpenAiCompatibleClient::new(
            http,
            &endpoint.url,
            &endpoint.model,
        ))
    } else {
        Box::new(super::ollama::OllamaClient::new(
            http,
            &endpoint.url,
            &endpoint.model,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    #[test]
    fn test_sniff_media_type() {
        assert_eq!(sniff_media_type(&[0x89, 0x50, 0x4E, 0x47, 0x0D]), "image/png");
        assert_eq!(sniff_media_type(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
        assert_eq!(sniff_media_type(&[0x42, 0x4D, 0x36]), "image/bmp");
        // Unknown defaults to jpeg
        assert_eq!(sniff_media_type(&[0x00, 0x01]), "image/jpeg");
        assert_eq!(sniff_media_type(&[]), "image/jpeg");
    }

    #[test]
    fn test_data_url_shape() {
        let url = data_url(&[0x89, 0x50, 0x4E, 0x47]);
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_build_client_selects_by_provider() {
        let mut endpoint = Endpoint {
            name: "e".to_string(),
            provider: ProviderKind::Ollama,
            url: "http://localhost:11434".to_string(),
            model: "llava".to_string(),
        };
        let client = build_client(&endpoint, reqwest::Client::new());
        assert_eq!(client.name(), "ollama");

        for kind in [
            ProviderKind::LmStudio,
            ProviderKind::LlamaCpp,
            ProviderKind::Oobabooga,
        ] {
            endpoint.provider = kind;
            let client = build_client(&endpoint, reqwest::Client::new());
            assert_eq!(client.name(), "openai-compatible");
        }
    }
}
