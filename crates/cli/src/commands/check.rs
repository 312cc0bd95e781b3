//! `aymara check`: Run a question through the admission heuristic.

use aymara_agent::QueryValidator;
use aymara_config::AppConfig;

pub fn run(question: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let validator = QueryValidator::from(&config.admission);

    if validator.is_admissible(question) {
        println!("✅ Admissible");
    } else {
        println!("❌ Rejected: {}", aymara_core::error::REFUSAL_MESSAGE);
    }

    Ok(())
}
