//! `orcas doctor`: diagnose configuration and connectivity.

use orcas_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("Orcas Doctor: System Diagnostics");
    println!("================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  [warn] No config file; using defaults. Run `orcas onboard`");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  [ok]   Config valid (provider: {})", config.provider);
            config
        }
        Err(e) => {
            println!("  [fail] Config invalid: {e}");
            println!("\n  1 blocking issue found. Fix the config and re-run.");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  [ok]   API key configured");
    } else {
        println!(
            "  [fail] No API key: set api_key, ORCAS_API_KEY or {}",
            config.provider.api_key_env()
        );
        issues += 1;
    }

    match super::open_store(&config).await {
        Ok(_) => println!("  [ok]   Database opens: {}", config.database_path().display()),
        Err(e) => {
            println!("  [fail] Database error: {e}");
            issues += 1;
        }
    }

    if config.has_api_key() {
        match orcas_providers::build_from_config(&config) {
            Ok(provider) => match provider.health_check().await {
                Ok(()) => println!("  [ok]   Connected to {}", provider.name()),
                Err(e) => {
                    println!("  [fail] Connection test failed: {e}");
                    issues += 1;
                }
            },
            Err(e) => {
                println!("  [fail] Provider setup failed: {e}");
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
