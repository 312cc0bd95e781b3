//! Configuration loading, validation, and management for AYMARA.
//!
//! Loads configuration from `$AYMARA_CONFIG` or `~/.aymara/config.toml`,
//! then applies environment variable overrides. Validates all settings at
//! startup. A missing API key is only fatal when [`AppConfig::require_api_key`]
//! is called, which the server does before binding.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.aymara/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model backend ("openai", "openrouter", "ollama", ...)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override the backend base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per response (unset = backend default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_tokens: Option<u32>,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Context store configuration
    #[serde(default)]
    pub context: ContextConfig,

    /// Question admission heuristic
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// Persona configuration
    #[serde(default)]
    pub persona: PersonaConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4-turbo".into()
}
fn default_temperature() -> f32 {
    0.3
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("gateway", &self.gateway)
            .field("context", &self.context)
            .field("admission", &self.admission)
            .field("persona", &self.persona)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins. Empty = same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: vec![],
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// How stored context is keyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Identity used when neither the request nor the payload names one
    #[serde(default = "default_identity")]
    pub default_identity: String,

    /// Payload field that may carry the identity
    #[serde(default = "default_identity_field")]
    pub identity_field: String,
}

fn default_identity() -> String {
    "2723".into()
}
fn default_identity_field() -> String {
    "idEmpleado".into()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_identity: default_identity(),
            identity_field: default_identity_field(),
        }
    }
}

/// Word lists and bounds for the question admission heuristic.
///
/// Every list is matched against the lower-cased question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Minimum question length in characters (inclusive)
    #[serde(default = "default_min_len")]
    pub min_len: usize,

    /// Maximum question length in characters (exclusive)
    #[serde(default = "default_max_len")]
    pub max_len: usize,

    /// Substrings that reject a question outright
    #[serde(default = "default_blocked_keywords")]
    pub blocked_keywords: Vec<String>,

    /// Interrogative words (whole-word match)
    #[serde(default = "default_interrogatives")]
    pub interrogatives: Vec<String>,

    /// Request verbs (whole-word match)
    #[serde(default = "default_request_verbs")]
    pub request_verbs: Vec<String>,

    /// Health-domain terms (whole-word match)
    #[serde(default = "default_domain_terms")]
    pub domain_terms: Vec<String>,

    /// Characters that mark the target language
    #[serde(default = "default_language_markers")]
    pub language_markers: String,
}

fn default_min_len() -> usize {
    3
}
fn default_max_len() -> usize {
    1000
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn default_blocked_keywords() -> Vec<String> {
    words(&[
        "política", "religión", "sexo", "pornografía", "drogas", "ilegal", "hackear", "crimen",
        "terrorismo", "violencia", "armas", "discriminación", "racismo", "xenofobia",
        "homofobia", "transfobia", "misoginia", "suicidio", "autolesión",
    ])
}
fn default_interrogatives() -> Vec<String> {
    words(&[
        "que", "qué", "como", "cómo", "cual", "cuál", "cuales", "cuáles", "donde", "dónde",
        "quien", "quién", "cuando", "cuándo", "cuanto", "cuánto", "cuanta", "cuánta", "por",
        "para",
    ])
}
fn default_request_verbs() -> Vec<String> {
    words(&[
        "necesito", "requiero", "solicito", "dame", "proporciona", "explica", "explícame",
        "ayuda", "ayúdame", "información", "describe", "resume", "indica",
    ])
}
fn default_domain_terms() -> Vec<String> {
    words(&[
        "medico", "médico", "medica", "médica", "paciente", "resumen", "historia", "clinica",
        "clínica", "clinico", "clínico", "salud", "eps", "ips", "hospital", "consulta",
        "tratamiento", "diagnóstico", "diagnostico", "factura", "glosa", "rips", "pqrd",
        "auditoría", "auditoria",
    ])
}
fn default_language_markers() -> String {
    "áéíóúñ¿¡".into()
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            min_len: default_min_len(),
            max_len: default_max_len(),
            blocked_keywords: default_blocked_keywords(),
            interrogatives: default_interrogatives(),
            request_verbs: default_request_verbs(),
            domain_terms: default_domain_terms(),
            language_markers: default_language_markers(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Override the system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,

    /// Load the system prompt from a file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_file: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path, then apply environment
    /// overrides.
    ///
    /// Recognised variables:
    /// - `AYMARA_CONFIG`: config file path
    /// - `AYMARA_API_KEY` (highest priority), `OPENAI_API_KEY`
    /// - `DEFAULT_MODEL`, `DEFAULT_TEMPERATURE`
    /// - `PORT`, `CORS_ORIGINS` (comma separated)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("AYMARA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_path());
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_blank("AYMARA_API_KEY").or_else(|| {
            if self.api_key.is_none() {
                non_blank("OPENAI_API_KEY")
            } else {
                None
            }
        }) {
            self.api_key = Some(key);
        }

        if let Some(model) = non_blank("DEFAULT_MODEL") {
            self.default_model = model;
        }

        if let Some(raw) = non_blank("DEFAULT_TEMPERATURE") {
            self.default_temperature = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!("DEFAULT_TEMPERATURE is not a number: {raw}"))
            })?;
        }

        if let Some(raw) = non_blank("PORT") {
            self.gateway.port = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::ValidationError(format!("PORT is not a valid port: {raw}")))?;
        }

        if let Some(raw) = non_blank("CORS_ORIGINS") {
            self.gateway.cors_origins = raw
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".aymara")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.admission.min_len >= self.admission.max_len {
            return Err(ConfigError::ValidationError(
                "admission.min_len must be smaller than admission.max_len".into(),
            ));
        }

        if self.context.default_identity.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "context.default_identity must not be blank".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// The API key, or `MissingCredential` when none is configured.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        match self.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingCredential {
                variable: "OPENAI_API_KEY".into(),
            }),
        }
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: None,
            gateway: GatewayConfig::default(),
            context: ContextConfig::default(),
            admission: AdmissionConfig::default(),
            persona: PersonaConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing credential: set {variable} or api_key in the config file")]
    MissingCredential { variable: String },
}
