//! Status command implementation

use crate::config::Config;
use crate::documents::DocumentLoader;
use crate::error::Result;
use crate::store::{RelationalStore, TableCounts};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: Option<String>,
    pub backend: String,
    pub database: String,
    pub recipes_dir: String,
    pub tags_file: String,
    pub recipe_documents: usize,
    /// `None` when the tag document is missing or unreadable
    pub tags_in_document: Option<usize>,
    pub memberships_in_document: Option<usize>,
    pub tables: TableCounts,
}

/// Get document and database totals
pub async fn cmd_status<S: RelationalStore>(config: &Config, store: &S) -> Result<StatusInfo> {
    info!("Getting status");

    let loader = DocumentLoader::new(&config.documents);
    let recipe_documents = loader.load_recipes()?.len();
    let (tags_in_document, memberships_in_document) = match loader.load_tags() {
        Ok(tags) => (
            Some(tags.len()),
            Some(tags.values().map(|entry| entry.recipes.len()).sum()),
        ),
        Err(e) => {
            debug!("Tag document unavailable: {}", e);
            (None, None)
        }
    };

    let tables = store.table_counts().await?;

    Ok(StatusInfo {
        config_path: config
            .paths
            .config_file
            .as_ref()
            .map(|p| p.display().to_string()),
        backend: store.backend().to_string(),
        database: config.database.display_target(),
        recipes_dir: config.documents.recipes_dir.display().to_string(),
        tags_file: config.documents.tags_file.display().to_string(),
        recipe_documents,
        tags_in_document,
        memberships_in_document,
        tables,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 recipe-sync Status\n");
    println!(
        "Configuration: {}",
        status.config_path.as_deref().unwrap_or("(environment defaults)")
    );
    println!("Database: {} ({})", status.database, status.backend);
    println!("\nDocuments:");
    println!("  Recipes dir: {}", status.recipes_dir);
    println!("  Recipe documents: {}", status.recipe_documents);
    println!("  Tags file: {}", status.tags_file);
    match (status.tags_in_document, status.memberships_in_document) {
        (Some(tags), Some(members)) => println!("  Tags: {} ({} memberships)", tags, members),
        _ => println!("  Tags: ✗ not readable"),
    }
    println!("\nDatabase Rows:");
    println!("  recipes: {}", status.tables.recipes);
    println!("  ingredients: {}", status.tables.ingredients);
    println!("  tags: {}", status.tables.tags);
    println!("  recipe_ingredients: {}", status.tables.recipe_ingredients);
    println!("  recipe_tags: {}", status.tables.recipe_tags);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_status_counts_documents_and_rows() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.documents.recipes_dir = tmp.path().join("recipes");
        config.documents.tags_file = tmp.path().join("missing-tags.json");
        std::fs::create_dir_all(&config.documents.recipes_dir).unwrap();
        std::fs::write(
            config.documents.recipes_dir.join("recipe_1.json"),
            r#"{"id":"1","name":"Toast","ingredients":[]}"#,
        )
        .unwrap();

        let store = SqliteStore::open(&tmp.path().join("status.db")).await.unwrap();
        store.create_schema().await.unwrap();

        let status = cmd_status(&config, &store).await.unwrap();
        assert_eq!(status.backend, "sqlite");
        assert_eq!(status.recipe_documents, 1);
        assert_eq!(status.tags_in_document, None);
        assert_eq!(status.memberships_in_document, None);
        assert_eq!(status.tables, TableCounts::default());
    }
}
