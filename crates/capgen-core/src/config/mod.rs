//! Settings management for capgen.
//!
//! Settings are loaded from a TOML file with sensible defaults. Only the
//! fields the pipeline consumes are modeled: endpoint bindings, prompt
//! templates, and batch execution knobs.

mod types;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Root settings structure for capgen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ordered endpoint bindings
    pub endpoints: Vec<Endpoint>,

    /// Ordered prompt templates
    pub templates: Vec<PromptTemplate>,

    /// Batch execution settings
    pub batch: BatchConfig,
}

impl Settings {
    /// Load settings from the default location.
    ///
    /// Returns default settings if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Get the default settings file path.
    ///
    /// Uses platform-appropriate directories, falling back to
    /// `~/.capgen/settings.toml` if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "capgen", "capgen")
            .map(|dirs| dirs.config_dir().to_path_buf().join("settings.toml"))
            .unwrap_or_else(|| {
                let expanded = shellexpand::tilde("~/.capgen/settings.toml");
                PathBuf::from(expanded.into_owned())
            })
    }

    /// Check the settings for internal consistency.
    ///
    /// Rejects duplicate endpoint/template names, templates that reference
    /// a missing endpoint, and a zero-width worker pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut endpoint_names = HashSet::new();
        for endpoint in &self.endpoints {
            if !endpoint_names.insert(endpoint.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate endpoint name '{}'",
                    endpoint.name
                )));
            }
        }

        let mut template_names = HashSet::new();
        for template in &self.templates {
            if !template_names.insert(template.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate template name '{}'",
                    template.name
                )));
            }
            if !endpoint_names.contains(template.endpoint.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "template '{}' references unknown endpoint '{}'",
                    template.name, template.endpoint
                )));
            }
        }

        if self.batch.workers == 0 {
            return Err(ConfigError::ValidationError(
                "batch.workers must be at least 1".to_string(),
            ));
        }
        if self.batch.export_fanout == 0 {
            return Err(ConfigError::ValidationError(
                "batch.export_fanout must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Look up an endpoint binding by name.
    pub fn find_endpoint(&self, name: &str) -> Result<&Endpoint, ConfigError> {
        self.endpoints
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| ConfigError::UnknownEndpoint(name.to_string()))
    }

    /// Look up a prompt template by name.
    pub fn find_template(&self, name: &str) -> Result<&PromptTemplate, ConfigError> {
        self.templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ConfigError::UnknownTemplate(name.to_string()))
    }

    /// Resolve a template's prompt text, substituting `{output_format}`.
    pub fn resolved_prompt(&self, template: &PromptTemplate) -> String {
        template
            .prompt
            .replace("{output_format}", &template.output_format)
    }

    /// Serialize the settings to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_settings() -> Settings {
        Settings {
            endpoints: vec![Endpoint {
                name: "local-ollama".to_string(),
                provider: ProviderKind::Ollama,
                url: "http://localhost:11434".to_string(),
                model: "llava:13b".to_string(),
            }],
            templates: vec![PromptTemplate {
                name: "booru".to_string(),
                prompt: "Describe this image as {output_format}.".to_string(),
                endpoint: "local-ollama".to_string(),
                output_format: "Text".to_string(),
            }],
            batch: BatchConfig::default(),
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.endpoints.is_empty());
        assert!(!settings.batch.parallel);
        assert_eq!(settings.batch.workers, 4);
        assert_eq!(settings.batch.effective_workers(), 1);
    }

    #[test]
    fn test_effective_workers_parallel() {
        let batch = BatchConfig {
            parallel: true,
            workers: 6,
            ..Default::default()
        };
        assert_eq!(batch.effective_workers(), 6);
    }

    #[test]
    fn test_settings_round_trip() {
        let settings = sample_settings();
        let toml = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.endpoints.len(), 1);
        assert_eq!(parsed.endpoints[0].provider, ProviderKind::Ollama);
        assert_eq!(parsed.templates[0].endpoint, "local-ollama");
    }

    #[test]
    fn test_provider_kind_kebab_case() {
        let settings: Settings = toml::from_str(
            r#"
            [[endpoints]]
            name = "studio"
            provider = "lm-studio"
            url = "http://localhost:1234"
            model = "qwen2-vl"
            "#,
        )
        .unwrap();
        assert_eq!(settings.endpoints[0].provider, ProviderKind::LmStudio);
        assert!(settings.endpoints[0].provider.is_openai_compatible());
    }

    #[test]
    fn test_resolved_prompt_substitution() {
        let settings = sample_settings();
        let template = settings.find_template("booru").unwrap();
        assert_eq!(
            settings.resolved_prompt(template),
            "Describe this image as Text."
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_endpoints() {
        let mut settings = sample_settings();
        settings.endpoints.push(settings.endpoints[0].clone());
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_dangling_endpoint_reference() {
        let mut settings = sample_settings();
        settings.templates[0].endpoint = "missing".to_string();
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut settings = sample_settings();
        settings.batch.workers = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_find_endpoint_missing() {
        let settings = sample_settings();
        assert!(matches!(
            settings.find_endpoint("nope"),
            Err(ConfigError::UnknownEndpoint(_))
        ));
    }
}
