//! Junction-table writes and phase commit

use crate::error::Result;
use crate::store::{
    PhaseScope, RecipeIngredientRepository, RecipeIngredientRow, RecipeTagRepository, RowId,
};
use tracing::{debug, info};

/// Idempotent writer for `recipe_ingredients` and `recipe_tags`.
///
/// Rows are only ever inserted or updated; rows whose source entry has
/// disappeared are left in place.
#[derive(Debug, Default)]
pub struct RelationWriter {
    pub lines_written: usize,
    pub memberships_inserted: usize,
    pub memberships_existing: usize,
}

impl RelationWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the recipe–ingredient row, or overwrite its amount, unit and
    /// position (last run wins).
    pub async fn upsert_recipe_ingredient<R>(
        &mut self,
        repo: &mut R,
        recipe_id: RowId,
        ingredient_id: RowId,
        amount: &str,
        unit: &str,
        order_index: i32,
    ) -> Result<()>
    where
        R: RecipeIngredientRepository + Send + ?Sized,
    {
        let row = RecipeIngredientRow {
            recipe_id,
            ingredient_id,
            amount: amount.to_string(),
            unit: unit.to_string(),
            order_index,
        };
        repo.upsert(&row).await?;
        debug!(
            "recipe {} ingredient {} at {}: '{}' '{}'",
            recipe_id, ingredient_id, order_index, amount, unit
        );
        self.lines_written += 1;
        Ok(())
    }

    /// Insert the membership pair unless it already exists
    pub async fn insert_recipe_tag_if_absent<R>(
        &mut self,
        repo: &mut R,
        recipe_id: RowId,
        tag_id: RowId,
    ) -> Result<bool>
    where
        R: RecipeTagRepository + Send + ?Sized,
    {
        let inserted = repo.insert_if_absent(recipe_id, tag_id).await?;
        if inserted {
            self.memberships_inserted += 1;
        } else {
            self.memberships_existing += 1;
        }
        Ok(inserted)
    }

    /// End the phase: commit, or roll back on a dry run
    pub async fn finish<S: PhaseScope>(&self, scope: S, phase: &str, dry_run: bool) -> Result<()> {
        if dry_run {
            info!("Dry run: rolling back {} phase", phase);
            scope.rollback().await
        } else {
            scope.commit().await?;
            info!("Committed {} phase", phase);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};

    #[derive(Default)]
    struct FakeJunctions {
        ingredients: HashMap<(RowId, RowId), RecipeIngredientRow>,
        tags: HashSet<(RowId, RowId)>,
    }

    #[async_trait]
    impl RecipeIngredientRepository for FakeJunctions {
        async fn upsert(&mut self, row: &RecipeIngredientRow) -> Result<()> {
            self.ingredients
                .insert((row.recipe_id, row.ingredient_id), row.clone());
            Ok(())
        }
    }

    #[async_trait]
    impl RecipeTagRepository for FakeJunctions {
        async fn insert_if_absent(&mut self, recipe_id: RowId, tag_id: RowId) -> Result<bool> {
            Ok(self.tags.insert((recipe_id, tag_id)))
        }
    }

    #[tokio::test]
    async fn test_upsert_last_write_wins() {
        let mut repo = FakeJunctions::default();
        let mut writer = RelationWriter::new();

        writer
            .upsert_recipe_ingredient(&mut repo, 7, 2, "1", "", 1)
            .await
            .unwrap();
        writer
            .upsert_recipe_ingredient(&mut repo, 7, 2, "2", "large", 0)
            .await
            .unwrap();

        assert_eq!(repo.ingredients.len(), 1);
        let row = &repo.ingredients[&(7, 2)];
        assert_eq!(row.amount, "2");
        assert_eq!(row.unit, "large");
        assert_eq!(row.order_index, 0);
        assert_eq!(writer.lines_written, 2);
    }

    #[tokio::test]
    async fn test_membership_counts_new_and_existing() {
        let mut repo = FakeJunctions::default();
        let mut writer = RelationWriter::new();

        assert!(writer.insert_recipe_tag_if_absent(&mut repo, 7, 1).await.unwrap());
        assert!(!writer.insert_recipe_tag_if_absent(&mut repo, 7, 1).await.unwrap());
        assert!(writer.insert_recipe_tag_if_absent(&mut repo, 8, 1).await.unwrap());

        assert_eq!(writer.memberships_inserted, 2);
        assert_eq!(writer.memberships_existing, 1);
        assert_eq!(repo.tags.len(), 2);
    }
}
