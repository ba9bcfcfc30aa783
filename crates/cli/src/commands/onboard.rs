//! `orcas onboard`: first-time setup.

use orcas_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Orcas: First-Time Setup");
    println!("=======================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created config.toml at: {}", config_path.display());
    }

    let config = super::load_config()?;
    super::open_store(&config).await?;
    println!("  Workspace database ready: {}", config.database_path().display());

    if !config.has_api_key() {
        println!("\n  Next steps:");
        println!("   1. Add api_key to {}", config_path.display());
        println!("      or set ORCAS_API_KEY / {}", config.provider.api_key_env());
        println!("   2. Run: orcas doctor");
        println!("   3. Run: orcas chat\n");
    }

    println!("  Setup complete! Run `orcas chat` to start chatting.\n");
    Ok(())
}
