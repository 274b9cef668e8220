//! MySQL backend (the recipe application's production database)

use super::{
    IngredientRepository, NewIngredient, NewTag, PhaseScope, RecipeIngredientRepository,
    RecipeIngredientRow, RecipeRepository, RecipeTagRepository, RelationalStore, RowId,
    TagRepository,
};
use crate::config::{Backend, DatabaseConfig, DB_CHARSET};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{MySql, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Insert-or-overwrite of one recipe_ingredients row.
///
/// Uses the `VALUES(col)` form rather than the 8.0.20+ row alias: MariaDB
/// and MySQL 5.7 (both accepted via `mysql:`/`mariadb:` URLs) have no row
/// alias, and 8.x still accepts `VALUES()` with a deprecation note.
const UPSERT_RECIPE_INGREDIENT_SQL: &str = r#"
INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount, unit, order_index)
VALUES (?, ?, ?, ?, ?)
ON DUPLICATE KEY UPDATE
    amount = VALUES(amount),
    unit = VALUES(unit),
    order_index = VALUES(order_index)
"#;

/// MySQL-backed relational store. Holds a single connection.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Connect using `database.url`, or the discrete host/port/user settings
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = match &config.url {
            Some(url) => MySqlConnectOptions::from_str(url)?,
            None => MySqlConnectOptions::new()
                .host(&config.host)
                .port(config.port)
                .username(&config.user)
                .password(&config.password())
                .database(&config.name),
        }
        .charset(DB_CHARSET);

        debug!("Connecting to MySQL at {}", config.display_target());

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl RelationalStore for MySqlStore {
    type Scope = MySqlPhase;

    fn backend(&self) -> Backend {
        Backend::MySql
    }

    async fn begin_phase(&self) -> Result<MySqlPhase> {
        let tx = self.pool.begin().await?;
        Ok(MySqlPhase { tx })
    }

    async fn count_rows(&self, table: &'static str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM `{}`", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let columns: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT CAST(column_name AS CHAR)
            FROM information_schema.columns
            WHERE table_schema = DATABASE() AND table_name = ?
            ORDER BY ordinal_position
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;
        Ok(columns)
    }
}

/// One MySQL transaction
pub struct MySqlPhase {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl RecipeRepository for MySqlPhase {
    async fn find_ids_by_name(&mut self, name: &str) -> Result<Vec<RowId>> {
        // The column collation is case-insensitive; recipe bridging is not.
        let ids: Vec<RowId> = sqlx::query_scalar(
            "SELECT id FROM recipes WHERE name = CAST(? AS CHAR) COLLATE utf8mb4_bin ORDER BY id LIMIT 2",
        )
        .bind(name)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }
}

#[async_trait]
impl IngredientRepository for MySqlPhase {
    async fn find_by_name(&mut self, name: &str) -> Result<Option<RowId>> {
        let id: Option<RowId> =
            sqlx::query_scalar("SELECT id FROM ingredients WHERE name = ? LIMIT 1")
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
        Ok(result.last_insert_id() as RowId)
    }
}

#[async_trait]
impl TagRepository for MySqlPhase {
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
        Ok(result.last_insert_id() as RowId)
    }
}

#[async_trait]
impl RecipeIngredientRepository for MySqlPhase {
    async fn upsert(&mut self, row: &RecipeIngredientRow) -> Result<()> {
        sqlx::query(UPSERT_RECIPE_INGREDIENT_SQL)
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
impl RecipeTagRepository for MySqlPhase {
    async fn insert_if_absent(&mut self, recipe_id: RowId, tag_id: RowId) -> Result<bool> {
        let result = sqlx::query("INSERT IGNORE INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PhaseScope for MySqlPhase {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
