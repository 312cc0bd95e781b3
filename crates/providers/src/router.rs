//! Provider construction from configuration.
//!
//! Picks the backend named in config, resolves its base URL and credential,
//! and hands back a shareable `Arc<dyn Provider>`.

use std::sync::Arc;
use std::time::Duration;

use aymara_config::{AppConfig, ConfigError};
use aymara_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Request timeout for model calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Backends that run locally and accept any key.
const KEYLESS_PROVIDERS: &[&str] = &["ollama", "vllm", "llamacpp"];

/// Build the configured provider.
///
/// Hosted backends require an API key; a missing key is a
/// [`ConfigError::MissingCredential`] so the caller can refuse to start.
/// Providers without a well-known base URL need an explicit `api_url`.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ConfigError> {
    let name = config.provider.as_str();

    let base_url = match (&config.api_url, default_base_url(name)) {
        (Some(url), _) => url.clone(),
        (None, Some(url)) => url.to_string(),
        (None, None) => {
            return Err(ConfigError::ValidationError(format!(
                "unknown provider '{name}': set api_url or use one of openai, openrouter, ollama, deepseek, groq, together, vllm, llamacpp"
            )));
        }
    };

    let api_key = if KEYLESS_PROVIDERS.contains(&name) {
        config.api_key.clone().unwrap_or_else(|| name.to_string())
    } else {
        config.require_api_key()?.to_string()
    };

    let provider = OpenAiCompatProvider::new(name, base_url, api_key, REQUEST_TIMEOUT)
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    Ok(Arc::new(provider))
}

/// The base URL of a well-known provider.
fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openai" => Some("https://api.openai.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "deepseek" => Some("https://api.deepseek.com/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        "llamacpp" => Some("http://localhost:8080/v1"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("openrouter").unwrap().contains("openrouter.ai"));
        assert!(default_base_url("ollama").unwrap().contains("localhost:11434"));
        assert!(default_base_url("opneai").is_none());
    }

    #[test]
    fn unknown_provider_without_url_is_rejected() {
        let config = AppConfig {
            provider: "opneai".into(),
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("opneai")));
    }

    #[test]
    fn unknown_provider_with_url_is_accepted() {
        let config = AppConfig {
            provider: "interno".into(),
            api_key: Some("sk-test".into()),
            api_url: Some("http://llm.intranet.local/v1".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "interno");
    }

    #[test]
    fn hosted_provider_requires_key() {
        let config = AppConfig::default();
        assert!(matches!(
            build_from_config(&config),
            Err(ConfigError::MissingCredential { .. })
        ));
    }

    #[test]
    fn build_with_key() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
    }

    #[test]
    fn local_provider_needs_no_key() {
        let config = AppConfig {
            provider: "ollama".into(),
            ..AppConfig::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "ollama");
    }
}
