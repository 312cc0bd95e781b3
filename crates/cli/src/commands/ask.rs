//! `aymara ask`: One-shot consultation from the terminal.

use std::sync::Arc;

use aymara_agent::{Assistant, Query};
use aymara_config::AppConfig;
use aymara_context::{ContextStore, IdentityPolicy};
use serde_json::Value;
use tracing::{debug, info};

pub async fn run(question: String, context: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let provider = aymara_providers::build_from_config(&config)?;

    // A one-shot process has nothing stored; context comes only from --context.
    let store = Arc::new(ContextStore::new(IdentityPolicy::from(&config.context)));
    let assistant = Assistant::from_config(&config, provider, store);
    debug!(provider = %assistant.provider_name(), model = %assistant.settings().model, "Assistant ready");

    let mut query = Query::new(question);
    // Context may be plain text or a JSON document; both go through the normalizer.
    query.context = context
        .map(|raw| aymara_context::normalize(Some(&Value::String(raw))))
        .filter(|rendered| !rendered.is_empty())
        .map(|rendered| rendered.into_string());

    let answer = assistant
        .process(query)
        .await
        .map_err(aymara_core::Error::from)?;

    info!(tokens = ?answer.tokens, "Answer received");
    println!("{}", answer.text);
    Ok(())
}
