pub mod chat;
pub mod doctor;
pub mod models;
pub mod onboard;
pub mod plan;
pub mod tools;

use orcas_config::AppConfig;
use orcas_store::SqliteStore;

/// Load config, turning failures into a message that points at the file.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}

/// Open the workspace database named by `config`, creating it if needed.
pub async fn open_store(config: &AppConfig) -> Result<SqliteStore, Box<dyn std::error::Error>> {
    let path = config.database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let url = format!("sqlite://{}", path.display());
    Ok(SqliteStore::new(&url).await?)
}
