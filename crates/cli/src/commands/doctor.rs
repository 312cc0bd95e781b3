//! `aymara doctor`: Diagnose configuration.

use aymara_config::AppConfig;
use aymara_core::persona::{Persona, PersonaSource};

pub async fn run(probe: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 AYMARA Doctor: Configuration Diagnostics");
    println!("===========================================\n");

    let mut issues = 0;

    let config_path = std::env::var("AYMARA_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| AppConfig::config_path());
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults (run `aymara init`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  1 issue found. Fix the configuration and re-run.");
            return Ok(());
        }
    };

    match aymara_providers::build_from_config(&config) {
        Ok(provider) => {
            println!(
                "  ✅ Provider ready: {} (model {})",
                provider.name(),
                config.default_model
            );
            if probe {
                match provider.health_check().await {
                    Ok(true) => println!("  ✅ Backend reachable"),
                    Ok(false) => {
                        println!("  ❌ Backend answered with an error status");
                        issues += 1;
                    }
                    Err(e) => {
                        println!("  ❌ Backend unreachable: {e}");
                        issues += 1;
                    }
                }
            }
        }
        Err(e) => {
            println!("  ❌ Provider unavailable: {e}");
            issues += 1;
        }
    }

    let persona = Persona::load(&PersonaSource {
        system_prompt_override: config.persona.system_prompt_override.clone(),
        system_prompt_file: config.persona.system_prompt_file.as_ref().map(Into::into),
    });
    if config.persona.system_prompt_file.is_some() && persona.source == "<builtin>" {
        println!("  ⚠️  System prompt file unreadable, built-in persona in use");
        issues += 1;
    } else {
        println!("  ✅ Persona: {}", persona.source);
    }

    if config.gateway.cors_origins.is_empty() {
        println!("  ⚠️  No CORS origins: browsers on other origins cannot call the API");
        issues += 1;
    } else {
        println!("  ✅ CORS origins: {}", config.gateway.cors_origins.join(", "));
    }

    println!(
        "  ✅ Default identity: {} (field `{}`)",
        config.context.default_identity, config.context.identity_field
    );

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
