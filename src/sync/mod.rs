//! Document → relational synchronization
//!
//! A run loads every document up front, then executes two phases in order:
//!
//! 1. ingredients: recipe documents → `ingredients` + `recipe_ingredients`
//! 2. tags: tag-membership document → `tags` + `recipe_tags`
//!
//! Each phase is one transaction committed at its end. A failure inside a
//! phase drops the transaction, so that phase writes nothing; a phase that
//! already committed stays committed. There is no checkpoint or resume.
//! Rows are never deleted, so relationships whose source entry was removed
//! from the documents persist until something else removes them.
//!
//! Running two syncs against the same database at once is unsupported:
//! concurrent find-or-create of the same new name can produce duplicates.

mod dedup;
mod resolver;
mod writer;

#[cfg(test)]
mod tests;

pub use dedup::*;
pub use resolver::*;
pub use writer::*;

use crate::config::Config;
use crate::documents::{DocumentLoader, DocumentSet, TagMembership};
use crate::error::Result;
use crate::progress::phase_progress;
use crate::store::{RelationalStore, RelationshipCounts};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Which phases a run executes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PhaseSelection {
    #[default]
    All,
    Ingredients,
    Tags,
}

impl PhaseSelection {
    pub fn includes_ingredients(self) -> bool {
        matches!(self, PhaseSelection::All | PhaseSelection::Ingredients)
    }

    pub fn includes_tags(self) -> bool {
        matches!(self, PhaseSelection::All | PhaseSelection::Tags)
    }
}

/// Options for one run
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Roll each phase back instead of committing
    pub dry_run: bool,
    pub phases: PhaseSelection,
}

/// Counters of the ingredient phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientPhaseStats {
    /// Recipe documents seen
    pub documents: usize,
    /// Documents resolved to a relational recipe and written
    pub recipes_processed: usize,
    pub recipes_missing: usize,
    pub recipes_ambiguous: usize,
    /// recipe_ingredients rows inserted or updated
    pub lines_written: usize,
    /// Ingredient lines with a blank description
    pub lines_skipped: usize,
    pub ingredients_created: usize,
}

/// Counters of the tag phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPhaseStats {
    pub tags: usize,
    pub tags_created: usize,
    pub memberships_seen: usize,
    pub memberships_inserted: usize,
    pub members_missing: usize,
    pub members_ambiguous: usize,
}

/// Summary of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub dry_run: bool,
    /// `None` when the phase was not selected
    pub ingredients: Option<IngredientPhaseStats>,
    pub tags: Option<TagPhaseStats>,
    /// Junction-table totals re-queried after both phases
    pub verification: RelationshipCounts,
}

/// Runs the ingredient and tag phases against one store
pub struct SyncEngine<'a, S: RelationalStore> {
    store: &'a S,
    config: &'a Config,
}

impl<'a, S: RelationalStore> SyncEngine<'a, S> {
    pub fn new(store: &'a S, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Execute a full run
    pub async fn run(&self, options: SyncOptions) -> Result<SyncReport> {
        let loader = DocumentLoader::new(&self.config.documents);
        let documents = loader.load_recipes()?;
        let tag_document = if options.phases.includes_tags() {
            Some(loader.load_tags()?)
        } else {
            None
        };

        let mut resolver =
            IdentityResolver::new(&documents, self.config.sync.fail_on_ambiguous_names);
        let mut report = SyncReport {
            dry_run: options.dry_run,
            ..Default::default()
        };

        if options.phases.includes_ingredients() {
            report.ingredients = Some(
                self.sync_ingredients(&documents, &mut resolver, options.dry_run)
                    .await?,
            );
        }

        if let Some(tag_document) = &tag_document {
            report.tags = Some(
                self.sync_tags(tag_document, &mut resolver, options.dry_run)
                    .await?,
            );
        }

        report.verification = self.store.relationship_counts().await?;
        info!(
            "Verification: {} recipe_ingredients rows, {} recipe_tags rows",
            report.verification.recipe_ingredients, report.verification.recipe_tags
        );

        Ok(report)
    }

    /// Ingredient phase: every recipe document in file-name order
    async fn sync_ingredients(
        &self,
        documents: &DocumentSet,
        resolver: &mut IdentityResolver<'_>,
        dry_run: bool,
    ) -> Result<IngredientPhaseStats> {
        info!("Importing ingredients...");
        let mut scope = self.store.begin_phase().await?;
        let mut dedup = EntityDeduplicator::new();
        let mut writer = RelationWriter::new();
        let mut stats = IngredientPhaseStats {
            documents: documents.len(),
            ..Default::default()
        };

        let bar = phase_progress(documents.len() as u64, "ingredients");

        for recipe in documents.recipes() {
            bar.inc(1);
            let recipe_id = match resolver.resolve_record(&mut scope, recipe).await? {
                Resolution::Found(id) => id,
                Resolution::Missing => {
                    stats.recipes_missing += 1;
                    continue;
                }
                Resolution::Ambiguous => {
                    stats.recipes_ambiguous += 1;
                    continue;
                }
            };

            // order_index follows the source position, skipped lines included
            for (order_index, line) in (0i32..).zip(recipe.ingredients.iter()) {
                if line.description.trim().is_empty() {
                    warn!(
                        "{}: ingredient {} has no description, skipping",
                        recipe.file_name, order_index
                    );
                    stats.lines_skipped += 1;
                    continue;
                }

                let ingredient_id = dedup.resolve_ingredient(&mut scope, &line.description).await?;
                writer
                    .upsert_recipe_ingredient(
                        &mut scope,
                        recipe_id,
                        ingredient_id,
                        line.amount.trim(),
                        line.unit.trim(),
                        order_index,
                    )
                    .await?;
            }

            stats.recipes_processed += 1;
            bar.set_message(recipe.name.clone());
            info!("  Processed {}", recipe.file_name);
        }
        bar.finish_and_clear();

        writer.finish(scope, "ingredient", dry_run).await?;

        stats.lines_written = writer.lines_written;
        stats.ingredients_created = dedup.ingredients_created;
        info!(
            "Imported ingredients for {} recipes ({} skipped)",
            stats.recipes_processed,
            stats.recipes_missing + stats.recipes_ambiguous
        );
        Ok(stats)
    }

    /// Tag phase: every tag, then every member recipe of that tag
    async fn sync_tags(
        &self,
        tag_document: &TagMembership,
        resolver: &mut IdentityResolver<'_>,
        dry_run: bool,
    ) -> Result<TagPhaseStats> {
        info!("Importing tags...");
        let mut scope = self.store.begin_phase().await?;
        let mut dedup = EntityDeduplicator::new();
        let mut writer = RelationWriter::new();
        let mut stats = TagPhaseStats {
            tags: tag_document.len(),
            ..Default::default()
        };

        for (tag_name, entry) in tag_document {
            let tag_id = dedup.resolve_tag(&mut scope, tag_name).await?;

            for member in &entry.recipes {
                stats.memberships_seen += 1;
                match resolver.resolve_id(&mut scope, member).await? {
                    Resolution::Found(recipe_id) => {
                        writer
                            .insert_recipe_tag_if_absent(&mut scope, recipe_id, tag_id)
                            .await?;
                    }
                    Resolution::Missing => stats.members_missing += 1,
                    Resolution::Ambiguous => stats.members_ambiguous += 1,
                }
            }
        }

        writer.finish(scope, "tag", dry_run).await?;

        stats.tags_created = dedup.tags_created;
        stats.memberships_inserted = writer.memberships_inserted;
        info!("Imported {} tags", stats.tags);
        Ok(stats)
    }
}
