//! SQLite backend

use super::schema::SQLITE_SCHEMA_SQL;
use super::{
    IngredientRepository, NewIngredient, NewTag, PhaseScope, RecipeIngredientRepository,
    RecipeIngredientRow, RecipeRepository, RecipeTagRepository, RelationalStore, RowId,
    TagRepository,
};
use crate::config::{Backend, DatabaseConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// SQLite-backed relational store
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect using `database.url` (must be a `sqlite:` URL)
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| Error::Config("SQLite backend requires database.url".to_string()))?;

        debug!("Connecting to SQLite database at {}", url);
        let options = SqliteConnectOptions::from_str(url)?;
        Self::with_options(options, config.connect_timeout_secs).await
    }

    /// Open (creating if needed) a database file directly
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);

        debug!("Opening SQLite database at {:?}", db_path);
        Self::with_options(options, 30).await
    }

    async fn with_options(options: SqliteConnectOptions, timeout_secs: u64) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(timeout_secs))
            .connect_with(options.foreign_keys(true))
            .await?;
        Ok(Self { pool })
    }

    /// Create the minimal schema if absent
    pub async fn create_schema(&self) -> Result<()> {
        info!("Creating SQLite schema");
        sqlx::query(SQLITE_SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl RelationalStore for SqliteStore {
    type Scope = SqlitePhase;

    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn begin_phase(&self) -> Result<SqlitePhase> {
        let tx = self.pool.begin().await?;
        Ok(SqlitePhase { tx })
    }

    async fn count_rows(&self, table: &'static str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?)")
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        Ok(columns)
    }
}

/// One SQLite transaction
pub struct SqlitePhase {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl RecipeRepository for SqlitePhase {
    async fn find_ids_by_name(&mut self, name: &str) -> Result<Vec<RowId>> {
        let ids: Vec<RowId> =
            sqlx::query_scalar("SELECT id FROM recipes WHERE name = ? ORDER BY id LIMIT 2")
                .bind(name)
                .fetch_all(&mut *self.tx)
                .await?;
        Ok(ids)
    }
}

#[async_trait]
impl IngredientRepository for SqlitePhase {
    async fn find_by_name(&mut self, name: &str) -> Result<Option<RowId>> {
        let id: Option<RowId> = sqlx::query_scalar("SELECT id FROM ingredients WHERE name = ? LIMIT 1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(id)
    }

    async fn create(&mut self, ingredient: &NewIngredient) -> Result<RowId> {
        let result = sqlx::query("INSERT INTO ingredients (name, plural_name) VALUES (?, ?)")
            .bind(&ingredient.name)
            .bind(&ingredient.plural_name)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl TagRepository for SqlitePhase {
    async fn find_by_name(&mut self, name: &str) -> Result<Option<RowId>> {
        let id: Option<RowId> = sqlx::query_scalar("SELECT id FROM tags WHERE name = ? LIMIT 1")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(id)
    }

    async fn create(&mut self, tag: &NewTag) -> Result<RowId> {
        let result = sqlx::query("INSERT INTO tags (name, slug) VALUES (?, ?)")
            .bind(&tag.name)
            .bind(&tag.slug)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl RecipeIngredientRepository for SqlitePhase {
    async fn upsert(&mut self, row: &RecipeIngredientRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount, unit, order_index)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(recipe_id, ingredient_id) DO UPDATE SET
                amount = excluded.amount,
                unit = excluded.unit,
                order_index = excluded.order_index
            "#,
        )
        .bind(row.recipe_id)
        .bind(row.ingredient_id)
        .bind(&row.amount)
        .bind(&row.unit)
        .bind(row.order_index)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl RecipeTagRepository for SqlitePhase {
    async fn insert_if_absent(&mut self, recipe_id: RowId, tag_id: RowId) -> Result<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PhaseScope for SqlitePhase {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
