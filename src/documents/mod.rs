//! Document store access
//!
//! Reads the JSON document store written by the recipe web application:
//! - one `recipe_*.json` file per recipe
//! - a single tag-membership document mapping tag name to member recipe ids
//!
//! Loading is eager and all-or-nothing: any unreadable or malformed file
//! fails the whole load with [`Error::DocumentRead`].
//!
//! Two places where the sync reads the documents differently from the
//! application that writes them:
//! - tags are visited in sorted name order, not the document's key order,
//!   so new tag ids are assigned the same way on every run
//! - an ingredient line whose description is blank is skipped, but its
//!   position still counts toward `order_index` of the lines after it

use crate::config::DocumentsConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A recipe document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeDocument {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<IngredientLine>,
    /// File the document was read from
    #[serde(skip)]
    pub file_name: String,
}

/// One line of a recipe's ingredient list. Position in the list is significant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngredientLine {
    pub description: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub unit: String,
}

/// Members of one tag in the tag-membership document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagEntry {
    /// Document recipe ids, in the order they were tagged
    pub recipes: Vec<String>,
}

/// Tag name to members. Sorted by name so tag rows are created in a stable order.
pub type TagMembership = BTreeMap<String, TagEntry>;

/// All recipe documents of one run plus the id→name projection
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    recipes: Vec<RecipeDocument>,
    names_by_id: HashMap<String, String>,
    name_counts: HashMap<String, usize>,
}

impl DocumentSet {
    pub fn new(recipes: Vec<RecipeDocument>) -> Self {
        let mut names_by_id = HashMap::with_capacity(recipes.len());
        let mut name_counts: HashMap<String, usize> = HashMap::new();

        for recipe in &recipes {
            if let Some(previous) = names_by_id.insert(recipe.id.clone(), recipe.name.clone()) {
                warn!(
                    "Recipe id '{}' appears in more than one document ('{}' replaced by '{}')",
                    recipe.id, previous, recipe.name
                );
            }
            *name_counts.entry(recipe.name.clone()).or_default() += 1;
        }

        Self {
            recipes,
            names_by_id,
            name_counts,
        }
    }

    /// Recipe documents in file-name order
    pub fn recipes(&self) -> &[RecipeDocument] {
        &self.recipes
    }

    /// Name of the recipe document with this id
    pub fn name_for(&self, recipe_id: &str) -> Option<&str> {
        self.names_by_id.get(recipe_id).map(String::as_str)
    }

    /// Whether exactly one recipe document carries this name
    pub fn is_name_unique(&self, name: &str) -> bool {
        self.name_counts.get(name).copied().unwrap_or(0) == 1
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

/// Reads recipe and tag documents from the configured locations
pub struct DocumentLoader<'a> {
    config: &'a DocumentsConfig,
}

impl<'a> DocumentLoader<'a> {
    pub fn new(config: &'a DocumentsConfig) -> Self {
        Self { config }
    }

    /// Load every recipe document, sorted by file name
    pub fn load_recipes(&self) -> Result<DocumentSet> {
        let files = self.recipe_files()?;
        info!(
            "Loading {} recipe documents from {}",
            files.len(),
            self.config.recipes_dir.display()
        );

        let mut recipes = Vec::with_capacity(files.len());
        for path in files {
            let mut recipe: RecipeDocument = read_json(&path)?;
            recipe.file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            debug!("Loaded recipe '{}' from {}", recipe.name, recipe.file_name);
            recipes.push(recipe);
        }

        Ok(DocumentSet::new(recipes))
    }

    /// Load the tag-membership document
    pub fn load_tags(&self) -> Result<TagMembership> {
        let tags: TagMembership = read_json(&self.config.tags_file)?;
        info!(
            "Loaded {} tags from {}",
            tags.len(),
            self.config.tags_file.display()
        );
        Ok(tags)
    }

    /// Recipe document paths directly inside the recipes directory
    fn recipe_files(&self) -> Result<Vec<PathBuf>> {
        let dir = &self.config.recipes_dir;
        let prefix = self.config.recipe_file_prefix.as_str();
        let mut files = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| Error::document(dir, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.starts_with(prefix) && name.ends_with(".json") {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::document(path, e))?;
    serde_json::from_str(&content).map_err(|e| Error::document(path, e))
}
