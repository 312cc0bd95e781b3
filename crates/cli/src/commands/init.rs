//! `aymara init`: Write a default configuration file.

use aymara_config::AppConfig;

pub fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    println!("🩺 AYMARA Setup\n");

    std::fs::create_dir_all(&config_dir)?;

    if config_path.exists() && !force {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set OPENAI_API_KEY (environment or .env) or add api_key to the file");
    println!("   2. Add your front-end origins to gateway.cors_origins");
    println!("   3. Run: aymara serve\n");

    Ok(())
}
