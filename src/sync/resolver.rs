//! Document recipe → relational recipe identity bridging
//!
//! The two stores share no key, so a recipe document is matched to the
//! `recipes` row with exactly the same name. A name that is not unique in
//! either store is reported as ambiguous instead of being matched to an
//! arbitrary row.

use crate::documents::{DocumentSet, RecipeDocument};
use crate::error::{Error, Result};
use crate::store::{RecipeRepository, RowId};
use std::collections::HashMap;
use tracing::warn;

/// Outcome of resolving one recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(RowId),
    /// No relational recipe carries the name, or the document id is unknown
    Missing,
    /// The name is shared by several documents or several relational rows
    Ambiguous,
}

/// Resolves recipe documents to relational ids, memoized for one run
pub struct IdentityResolver<'a> {
    documents: &'a DocumentSet,
    fail_on_ambiguous: bool,
    resolved: HashMap<String, Resolution>,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(documents: &'a DocumentSet, fail_on_ambiguous: bool) -> Self {
        Self {
            documents,
            fail_on_ambiguous,
            resolved: HashMap::new(),
        }
    }

    /// Resolve a recipe document by its name
    pub async fn resolve_record<R>(
        &mut self,
        repo: &mut R,
        recipe: &RecipeDocument,
    ) -> Result<Resolution>
    where
        R: RecipeRepository + Send + ?Sized,
    {
        self.resolve_name(repo, &recipe.name).await
    }

    /// Resolve a document recipe id through the id→name projection
    pub async fn resolve_id<R>(&mut self, repo: &mut R, recipe_id: &str) -> Result<Resolution>
    where
        R: RecipeRepository + Send + ?Sized,
    {
        let documents = self.documents;
        match documents.name_for(recipe_id) {
            Some(name) => self.resolve_name(repo, name).await,
            None => {
                warn!("Tagged recipe id '{}' has no recipe document", recipe_id);
                Ok(Resolution::Missing)
            }
        }
    }

    async fn resolve_name<R>(&mut self, repo: &mut R, name: &str) -> Result<Resolution>
    where
        R: RecipeRepository + Send + ?Sized,
    {
        if let Some(resolution) = self.resolved.get(name) {
            return Ok(*resolution);
        }

        let resolution = if !self.documents.is_name_unique(name) {
            warn!("Recipe name '{}' is used by more than one document", name);
            Resolution::Ambiguous
        } else {
            match repo.find_ids_by_name(name).await?.as_slice() {
                [] => {
                    warn!("No recipe named '{}' in the database, skipping", name);
                    Resolution::Missing
                }
                [id] => Resolution::Found(*id),
                _ => {
                    warn!("Recipe name '{}' matches several database rows", name);
                    Resolution::Ambiguous
                }
            }
        };

        if resolution == Resolution::Ambiguous && self.fail_on_ambiguous {
            return Err(Error::AmbiguousRecipeName(name.to_string()));
        }

        self.resolved.insert(name.to_string(), resolution);
        Ok(resolution)
    }
}
