//! Find-or-create for shared entities (ingredients, tags)

use crate::error::Result;
use crate::store::{IngredientRepository, NewIngredient, NewTag, RowId, TagRepository};
use std::collections::HashMap;
use tracing::debug;

/// Slug for a tag name: lowercase, spaces replaced with hyphens
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// Maps normalized entity names to relational ids within one phase.
///
/// Each distinct name reaches the database at most once per phase; later
/// references are served from memory.
#[derive(Debug, Default)]
pub struct EntityDeduplicator {
    ingredients: HashMap<String, RowId>,
    tags: HashMap<String, RowId>,
    pub ingredients_created: usize,
    pub tags_created: usize,
}

impl EntityDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the ingredient named `name` (trimmed), creating it if absent
    pub async fn resolve_ingredient<R>(&mut self, repo: &mut R, name: &str) -> Result<RowId>
    where
        R: IngredientRepository + Send + ?Sized,
    {
        let name = name.trim();
        if let Some(id) = self.ingredients.get(name) {
            return Ok(*id);
        }

        let id = match repo.find_by_name(name).await? {
            Some(id) => id,
            None => {
                let id = repo
                    .create(&NewIngredient {
                        name: name.to_string(),
                        plural_name: name.to_string(),
                    })
                    .await?;
                debug!("Created ingredient '{}' ({})", name, id);
                self.ingredients_created += 1;
                id
            }
        };

        self.ingredients.insert(name.to_string(), id);
        Ok(id)
    }

    /// Id of the tag named `name`, creating it with a fresh slug if absent.
    /// Existing tags keep whatever slug they already have.
    pub async fn resolve_tag<R>(&mut self, repo: &mut R, name: &str) -> Result<RowId>
    where
        R: TagRepository + Send + ?Sized,
    {
        if let Some(id) = self.tags.get(name) {
            return Ok(*id);
        }

        let id = match repo.find_by_name(name).await? {
            Some(id) => id,
            None => {
                let slug = slugify(name);
                let id = repo
                    .create(&NewTag {
                        name: name.to_string(),
                        slug,
                    })
                    .await?;
                debug!("Created tag '{}' ({})", name, id);
                self.tags_created += 1;
                id
            }
        };

        self.tags.insert(name.to_string(), id);
        Ok(id)
    }
}
