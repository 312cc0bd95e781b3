//! `aymara serve`: Start the HTTP gateway.

use aymara_config::{AppConfig, ConfigError};
use tracing::info;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if let Err(e @ ConfigError::MissingCredential { .. }) =
        aymara_providers::build_from_config(&config)
    {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables (or add them to .env):");
        eprintln!("    AYMARA_API_KEY=sk-...");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add `api_key` to {}", AppConfig::config_path().display());
        eprintln!();
        return Err(e.into());
    }

    println!("🩺 AYMARA Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Provider:  {} ({})", config.provider, config.default_model);
    if config.gateway.cors_origins.is_empty() {
        println!("   CORS:      no cross-origin access");
    } else {
        println!("   CORS:      {}", config.gateway.cors_origins.join(", "));
    }

    info!(port = config.gateway.port, "Starting gateway");
    aymara_gateway::start(config).await?;

    Ok(())
}
