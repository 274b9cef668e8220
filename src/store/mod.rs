//! Relational store access
//!
//! The sync engine talks to the relational schema only through the typed
//! repository traits below. Writes happen inside a [`PhaseScope`], a single
//! transaction that is committed once at the end of a sync phase; dropping a
//! scope without committing discards its writes.
//!
//! Two sqlx backends implement the traits:
//! - [`MySqlStore`]: the production recipe database
//! - [`SqliteStore`]: local scratch databases and tests

mod mysql;
pub mod schema;
mod sqlite;

pub use mysql::*;
pub use sqlite::*;

use crate::config::Backend;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Autoincrement primary key of a relational row
pub type RowId = i64;

/// Ingredient row to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIngredient {
    pub name: String,
    pub plural_name: String,
}

/// Tag row to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
}

/// Recipe–ingredient junction row, keyed by `(recipe_id, ingredient_id)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredientRow {
    pub recipe_id: RowId,
    pub ingredient_id: RowId,
    pub amount: String,
    pub unit: String,
    pub order_index: i32,
}

/// Lookups against the pre-existing `recipes` table
#[async_trait]
pub trait RecipeRepository {
    /// Ids of recipes whose name equals `name` exactly (case-sensitive).
    /// At most two ids are returned, which is enough to detect a collision.
    async fn find_ids_by_name(&mut self, name: &str) -> Result<Vec<RowId>>;
}

#[async_trait]
pub trait IngredientRepository {
    async fn find_by_name(&mut self, name: &str) -> Result<Option<RowId>>;

    async fn create(&mut self, ingredient: &NewIngredient) -> Result<RowId>;
}

#[async_trait]
pub trait TagRepository {
    async fn find_by_name(&mut self, name: &str) -> Result<Option<RowId>>;

    async fn create(&mut self, tag: &NewTag) -> Result<RowId>;
}

#[async_trait]
pub trait RecipeIngredientRepository {
    /// Insert the row, or overwrite amount, unit and order_index of the
    /// existing `(recipe_id, ingredient_id)` row.
    async fn upsert(&mut self, row: &RecipeIngredientRow) -> Result<()>;
}

#[async_trait]
pub trait RecipeTagRepository {
    /// Insert the membership pair. Returns false if it already existed.
    async fn insert_if_absent(&mut self, recipe_id: RowId, tag_id: RowId) -> Result<bool>;
}

/// One transactional unit of work covering every repository
#[async_trait]
pub trait PhaseScope:
    RecipeRepository
    + IngredientRepository
    + TagRepository
    + RecipeIngredientRepository
    + RecipeTagRepository
    + Send
    + Sized
{
    async fn commit(self) -> Result<()>;

    async fn rollback(self) -> Result<()>;
}

/// Row totals of the two junction tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipCounts {
    pub recipe_ingredients: i64,
    pub recipe_tags: i64,
}

/// Row totals of every table the engine touches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    pub recipes: i64,
    pub ingredients: i64,
    pub tags: i64,
    pub recipe_ingredients: i64,
    pub recipe_tags: i64,
}

/// A relational backend
#[async_trait]
pub trait RelationalStore: Send + Sync {
    type Scope: PhaseScope;

    fn backend(&self) -> Backend;

    /// Open the transaction for one sync phase
    async fn begin_phase(&self) -> Result<Self::Scope>;

    /// `SELECT COUNT(*)` of one of the schema tables
    async fn count_rows(&self, table: &'static str) -> Result<i64>;

    /// Column names of `table`; empty when the table does not exist
    async fn table_columns(&self, table: &str) -> Result<Vec<String>>;

    async fn relationship_counts(&self) -> Result<RelationshipCounts> {
        Ok(RelationshipCounts {
            recipe_ingredients: self.count_rows(schema::RECIPE_INGREDIENTS).await?,
            recipe_tags: self.count_rows(schema::RECIPE_TAGS).await?,
        })
    }

    async fn table_counts(&self) -> Result<TableCounts> {
        Ok(TableCounts {
            recipes: self.count_rows(schema::RECIPES).await?,
            ingredients: self.count_rows(schema::INGREDIENTS).await?,
            tags: self.count_rows(schema::TAGS).await?,
            recipe_ingredients: self.count_rows(schema::RECIPE_INGREDIENTS).await?,
            recipe_tags: self.count_rows(schema::RECIPE_TAGS).await?,
        })
    }
}
