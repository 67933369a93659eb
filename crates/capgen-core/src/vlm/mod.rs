//! Caption service clients.
//!
//! Provides a client abstraction over the supported vision-language-model
//! backends (Ollama and the OpenAI-compatible family) and a factory that
//! builds the right client for an endpoint binding.

pub(crate) mod client;
pub(crate) mod ollama;
pub(crate) mod openai;

pub use client::{build_client, data_url, sniff_media_type, CaptionClient};
