//! `orcas models`: list models from the configured provider.

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let provider = orcas_providers::build_from_config(&config)?;
    let models = provider.list_models().await?;

    if models.is_empty() {
        println!("No models reported by {}.", provider.name());
        return Ok(());
    }

    println!("Models from {} (default: {}):", provider.name(), config.default_model);
    println!();
    let width = models.iter().map(|m| m.display_name.len()).max().unwrap_or(0);
    for model in &models {
        println!(
            "  {:<width$}  {}  ({})",
            model.display_name, model.display_label, model.id
        );
    }

    Ok(())
}
