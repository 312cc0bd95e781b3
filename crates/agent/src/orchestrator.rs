//! The consultation pipeline.
//!
//! 1. **Admit** the question through the [`QueryValidator`]
//! 2. **Pick context**: explicit text from the request, else the stored
//!    context for the caller's identity
//! 3. **Build messages**: persona, optional context, user question
//! 4. **Call the model** once; failures are mapped to [`ConsultError`] and
//!    never retried here

use std::sync::Arc;

use aymara_config::AppConfig;
use aymara_context::{ContextStore, LOG_PREVIEW_CHARS, preview};
use aymara_core::error::ConsultError;
use aymara_core::identity::Identity;
use aymara_core::message::Message;
use aymara_core::persona::{Persona, PersonaSource};
use aymara_core::provider::{Provider, ProviderRequest};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::validator::QueryValidator;

/// Reply used when the model answers with blank text.
pub const FALLBACK_REPLY: &str = "Lo siento, no pude procesar tu consulta.";

/// A question plus whatever the caller supplied with it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    pub question: String,

    /// Context text that overrides any stored context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Whose stored context to use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,

    /// Opaque caller data; logged, never sent to the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Query {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }
}

/// The model's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,

    /// Total tokens reported by the backend
    pub tokens: Option<u32>,
}

/// Model parameters used for every call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl From<&AppConfig> for ModelSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_tokens: config.default_max_tokens,
        }
    }
}

/// Answers questions against a model backend.
pub struct Assistant {
    provider: Arc<dyn Provider>,
    store: Arc<ContextStore>,
    validator: QueryValidator,
    persona: Persona,
    settings: ModelSettings,
}

impl Assistant {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<ContextStore>,
        validator: QueryValidator,
        persona: Persona,
        settings: ModelSettings,
    ) -> Self {
        Self {
            provider,
            store,
            validator,
            persona,
            settings,
        }
    }

    /// Build an assistant from application configuration.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        store: Arc<ContextStore>,
    ) -> Self {
        let persona = Persona::load(&PersonaSource {
            system_prompt_override: config.persona.system_prompt_override.clone(),
            system_prompt_file: config.persona.system_prompt_file.as_ref().map(Into::into),
        });

        Self::new(
            provider,
            store,
            QueryValidator::from(&config.admission),
            persona,
            ModelSettings::from(config),
        )
    }

    pub fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    pub fn validator(&self) -> &QueryValidator {
        &self.validator
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Answer a question.
    pub async fn process(&self, query: Query) -> Result<Answer, ConsultError> {
        info!(question = %query.question, "Consultation received");
        if let Some(metadata) = &query.metadata {
            debug!(metadata = %metadata, "Consultation metadata");
        }

        if !self.validator.is_admissible(&query.question) {
            warn!(question = %query.question, "Question rejected as out of scope");
            return Err(ConsultError::rejected());
        }

        let context = self.effective_context(&query).await;
        if let Some(context) = &context {
            info!(context = %preview(context, LOG_PREVIEW_CHARS), "Using additional context");
        }

        let request = ProviderRequest {
            model: self.settings.model.clone(),
            messages: self.build_messages(&query.question, context.as_deref()),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        match self.provider.complete(request).await {
            Ok(response) => {
                let content = response.message.content.trim();
                let text = if content.is_empty() {
                    FALLBACK_REPLY.to_string()
                } else {
                    response.message.content.clone()
                };
                let tokens = response.usage.map(|u| u.total_tokens);
                debug!(model = %response.model, tokens = ?tokens, "Consultation answered");
                Ok(Answer { text, tokens })
            }
            Err(e) => {
                let err = ConsultError::from_provider(&e);
                error!(
                    question = %query.question,
                    provider = %self.provider.name(),
                    kind = err.kind(),
                    error = %e,
                    "Consultation failed"
                );
                Err(err)
            }
        }
    }

    /// Explicit non-blank context wins over the stored entry.
    async fn effective_context(&self, query: &Query) -> Option<String> {
        if let Some(explicit) = query.context.as_deref().map(str::trim)
            && !explicit.is_empty()
        {
            return Some(explicit.to_string());
        }

        let identity = query
            .identity
            .clone()
            .unwrap_or_else(|| self.store.policy().default_identity.clone());

        self.store
            .get(&identity)
            .await
            .filter(|c| !c.is_empty())
            .map(|c| c.into_string())
    }

    fn build_messages(&self, question: &str, context: Option<&str>) -> Vec<Message> {
        let mut messages = vec![Message::system(self.persona.system_prompt.clone())];
        if let Some(context) = context {
            messages.push(Message::system(Persona::context_message(context)));
        }
        messages.push(Message::user(question));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingProvider, ScriptedProvider};
    use aymara_core::error::{BackendFailure, ProviderError, GENERIC_FAILURE_MESSAGE, HIGH_DEMAND_MESSAGE, REFUSAL_MESSAGE};
    use aymara_core::message::Role;
    use serde_json::json;

    const QUESTION: &str = "¿Cuáles son los requisitos para radicar una factura?";

    fn assistant(provider: Arc<dyn Provider>) -> Assistant {
        let config = AppConfig::default();
        Assistant::from_config(&config, provider, Arc::new(ContextStore::default()))
    }

    #[tokio::test]
    async fn rejected_question_never_reaches_model() {
        let provider = Arc::new(ScriptedProvider::new("R", Some(100)));
        let assistant = assistant(provider.clone());

        let mut query = Query::new("hi");
        query.identity = Some(Identity::from(7_i64));
        let err = assistant.process(query).await.unwrap_err();

        match err {
            ConsultError::RejectedQuery { message } => assert_eq!(message, REFUSAL_MESSAGE),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn answer_carries_text_and_tokens() {
        let provider = Arc::new(ScriptedProvider::new("R", Some(100)));
        let assistant = assistant(provider.clone());

        let answer = assistant.process(Query::new(QUESTION)).await.unwrap();
        assert_eq!(
            answer,
            Answer {
                text: "R".into(),
                tokens: Some(100)
            }
        );

        let request = provider.last_request();
        assert_eq!(request.model, "gpt-4-turbo");
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(request.max_tokens, None);
    }

    #[tokio::test]
    async fn missing_usage_gives_null_tokens() {
        let provider = Arc::new(ScriptedProvider::new("R", None));
        let answer = assistant(provider).process(Query::new(QUESTION)).await.unwrap();
        assert_eq!(answer.tokens, None);
    }

    #[tokio::test]
    async fn blank_reply_uses_fallback() {
        let provider = Arc::new(ScriptedProvider::new("   ", Some(3)));
        let answer = assistant(provider).process(Query::new(QUESTION)).await.unwrap();
        assert_eq!(answer.text, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn rate_limit_maps_to_high_demand() {
        let provider = Arc::new(FailingProvider::rate_limited());
        let assistant = assistant(provider.clone());

        let err = assistant.process(Query::new(QUESTION)).await.unwrap_err();
        match err {
            ConsultError::BackendUnavailable { cause, message } => {
                assert_eq!(cause, BackendFailure::RateLimited);
                assert_eq!(message, HIGH_DEMAND_MESSAGE);
            }
            other => panic!("expected backend failure, got {other:?}"),
        }
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn other_failures_map_to_generic_message() {
        let provider = Arc::new(FailingProvider::new(ProviderError::Network(
            "connection refused".into(),
        )));
        let err = assistant(provider).process(Query::new(QUESTION)).await.unwrap_err();
        match err {
            ConsultError::BackendUnavailable { cause, message } => {
                assert_eq!(cause, BackendFailure::Failure);
                assert_eq!(message, GENERIC_FAILURE_MESSAGE);
                assert!(!message.contains("connection refused"));
            }
            other => panic!("expected backend failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn messages_are_persona_context_question() {
        let provider = Arc::new(ScriptedProvider::new("R", Some(1)));
        let assistant = assistant(provider.clone());

        let mut query = Query::new(QUESTION);
        query.context = Some("Paciente con EPS Sura".into());
        assistant.process(query).await.unwrap();

        let messages = provider.last_request().messages;
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("AYMARA"));
        assert_eq!(messages[1].role, Role::System);
        assert_eq!(
            messages[1].content,
            "Contexto adicional para responder: Paciente con EPS Sura"
        );
        assert_eq!(messages[2].role, Role::User);
        assert_eq!(messages[2].content, QUESTION);
    }

    #[tokio::test]
    async fn stored_context_is_used_for_identity() {
        let provider = Arc::new(ScriptedProvider::new("R", Some(1)));
        let assistant = assistant(provider.clone());
        assistant
            .store()
            .put(None, Some(&json!({"idEmpleado": 42, "diagnosticos": ["Hipertensión"]})))
            .await;

        let mut query = Query::new(QUESTION);
        query.identity = Some(Identity::from(42_i64));
        assistant.process(query).await.unwrap();

        let messages = provider.last_request().messages;
        assert_eq!(messages.len(), 3);
        assert!(messages[1].content.contains("1. Hipertensión"));
    }

    #[tokio::test]
    async fn explicit_context_beats_stored() {
        let provider = Arc::new(ScriptedProvider::new("R", Some(1)));
        let assistant = assistant(provider.clone());
        assistant
            .store()
            .put(None, Some(&json!({"diagnosticos": ["Asma"]})))
            .await;

        let mut query = Query::new(QUESTION);
        query.context = Some("Contexto explícito".into());
        assistant.process(query).await.unwrap();

        let messages = provider.last_request().messages;
        assert!(messages[1].content.ends_with("Contexto explícito"));
        assert!(!messages[1].content.contains("Asma"));
    }

    #[tokio::test]
    async fn blank_context_and_empty_store_send_two_messages() {
        let provider = Arc::new(ScriptedProvider::new("R", Some(1)));
        let assistant = assistant(provider.clone());

        let mut query = Query::new(QUESTION);
        query.context = Some("   ".into());
        query.identity = Some(Identity::from(999_i64));
        assistant.process(query).await.unwrap();

        let messages = provider.last_request().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::User);
    }

    #[tokio::test]
    async fn default_identity_context_applies_without_identity() {
        let provider = Arc::new(ScriptedProvider::new("R", Some(1)));
        let assistant = assistant(provider.clone());
        assistant
            .store()
            .put(None, Some(&json!({"vista": "urgencias"})))
            .await;

        assistant.process(Query::new(QUESTION)).await.unwrap();
        let messages = provider.last_request().messages;
        assert!(messages[1].content.contains("urgencias"));
    }
}
