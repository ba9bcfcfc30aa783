//! `orcas tools`: print the tool schemas advertised to the model.

use std::sync::Arc;

use orcas_store::{InMemoryStore, UnavailableCalendar};
use orcas_tools::default_registry;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Schemas do not depend on the backing store.
    let registry = default_registry(
        Arc::new(InMemoryStore::new()),
        Arc::new(UnavailableCalendar::new("not connected")),
    );
    println!("{}", serde_json::to_string_pretty(&registry.schemas())?);
    Ok(())
}
