//! Relational schema the engine reads and writes

use super::RelationalStore;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const RECIPES: &str = "recipes";
pub const INGREDIENTS: &str = "ingredients";
pub const TAGS: &str = "tags";
pub const RECIPE_INGREDIENTS: &str = "recipe_ingredients";
pub const RECIPE_TAGS: &str = "recipe_tags";

/// Tables and the columns the engine depends on
pub const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (RECIPES, &["id", "name"]),
    (INGREDIENTS, &["id", "name", "plural_name"]),
    (
        RECIPE_INGREDIENTS,
        &["recipe_id", "ingredient_id", "amount", "unit", "order_index"],
    ),
    (TAGS, &["id", "name", "slug"]),
    (RECIPE_TAGS, &["recipe_id", "tag_id"]),
];

/// Minimal schema for SQLite scratch databases. Not a migration: the MySQL
/// schema is owned by the web application.
pub const SQLITE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS recipes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ingredients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    plural_name TEXT
);

CREATE TABLE IF NOT EXISTS recipe_ingredients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
    amount TEXT,
    unit TEXT,
    order_index INTEGER NOT NULL DEFAULT 0,
    UNIQUE(recipe_id, ingredient_id)
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recipe_tags (
    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (recipe_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_recipes_name ON recipes(name);
"#;

/// A table the engine needs, and what is missing from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCheck {
    pub table: String,
    pub exists: bool,
    pub missing_columns: Vec<String>,
}

impl TableCheck {
    pub fn is_ok(&self) -> bool {
        self.exists && self.missing_columns.is_empty()
    }
}

/// Result of checking the live schema against [`REQUIRED_COLUMNS`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReport {
    pub tables: Vec<TableCheck>,
}

impl SchemaReport {
    pub fn is_ok(&self) -> bool {
        self.tables.iter().all(TableCheck::is_ok)
    }

    /// Human-readable list of every problem found
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for table in &self.tables {
            if !table.exists {
                problems.push(format!("missing table '{}'", table.table));
            } else {
                for column in &table.missing_columns {
                    problems.push(format!("missing column '{}.{}'", table.table, column));
                }
            }
        }
        problems
    }

    /// Turn a failed report into [`Error::Schema`]
    pub fn into_result(self) -> Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(Error::Schema(self.problems().join(", ")))
        }
    }
}

/// Compare the live schema with the tables and columns the engine needs
pub async fn check_schema<S: RelationalStore>(store: &S) -> Result<SchemaReport> {
    info!("Checking {} schema", store.backend());
    let mut report = SchemaReport::default();

    for (table, required) in REQUIRED_COLUMNS {
        let columns = store.table_columns(table).await?;
        debug!("Table {} has columns {:?}", table, columns);

        let missing_columns = if columns.is_empty() {
            Vec::new()
        } else {
            required
                .iter()
                .filter(|c| !columns.iter().any(|have| have.eq_ignore_ascii_case(c)))
                .map(|c| c.to_string())
                .collect()
        };

        report.tables.push(TableCheck {
            table: table.to_string(),
            exists: !columns.is_empty(),
            missing_columns,
        });
    }

    Ok(report)
}
