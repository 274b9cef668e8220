use super::*;
use crate::error::Error;
use crate::store::{RowId, SqliteStore};
use std::path::Path;
use tempfile::TempDir;

struct Fixture {
    _tmp: TempDir,
    config: Config,
    store: SqliteStore,
}

impl Fixture {
    async fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let recipes_dir = tmp.path().join("data").join("recipes");
        std::fs::create_dir_all(&recipes_dir).unwrap();

        let mut config = Config::default();
        config.documents.recipes_dir = recipes_dir;
        config.documents.tags_file = tmp.path().join("data").join("tags.json");
        std::fs::write(&config.documents.tags_file, "{}").unwrap();

        let store = SqliteStore::open(&tmp.path().join("recipes.db")).await.unwrap();
        store.create_schema().await.unwrap();

        Self {
            _tmp: tmp,
            config,
            store,
        }
    }

    fn recipes_dir(&self) -> &Path {
        &self.config.documents.recipes_dir
    }

    fn write_recipe(&self, file: &str, json: &str) {
        std::fs::write(self.recipes_dir().join(file), json).unwrap();
    }

    fn write_tags(&self, json: &str) {
        std::fs::write(&self.config.documents.tags_file, json).unwrap();
    }

    async fn insert_recipe(&self, name: &str) -> RowId {
        sqlx::query("INSERT INTO recipes (name) VALUES (?)")
            .bind(name)
            .execute(self.store.pool())
            .await
            .unwrap()
            .last_insert_rowid()
    }

    async fn run(&self) -> SyncReport {
        self.run_with(SyncOptions::default()).await.unwrap()
    }

    async fn run_with(&self, options: SyncOptions) -> Result<SyncReport> {
        SyncEngine::new(&self.store, &self.config).run(options).await
    }

    async fn recipe_lines(&self, recipe_id: RowId) -> Vec<(String, String, String, i32)> {
        sqlx::query_as(
            r#"
            SELECT i.name, ri.amount, ri.unit, ri.order_index
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ?
            ORDER BY ri.order_index, i.name
            "#,
        )
        .bind(recipe_id)
        .fetch_all(self.store.pool())
        .await
        .unwrap()
    }
}

const PANCAKES: &str = r#"{
    "id": "r1",
    "name": "Pancakes",
    "ingredients": [
        {"description": "Flour", "amount": "2", "unit": "cup"},
        {"description": "Egg", "amount": "1", "unit": ""},
        {"description": "Milk", "amount": "1", "unit": "cup"}
    ]
}"#;

#[tokio::test]
async fn test_pancakes_scenario() {
    let fx = Fixture::new().await;
    fx.write_recipe("recipe_r1.json", PANCAKES);
    let recipe_id = fx.insert_recipe("Pancakes").await;

    let report = fx.run().await;
    let stats = report.ingredients.unwrap();
    assert_eq!(stats.recipes_processed, 1);
    assert_eq!(stats.lines_written, 3);
    assert_eq!(stats.ingredients_created, 3);
    assert_eq!(report.verification.recipe_ingredients, 3);

    assert_eq!(
        fx.recipe_lines(recipe_id).await,
        vec![
            ("Flour".to_string(), "2".to_string(), "cup".to_string(), 0),
            ("Egg".to_string(), "1".to_string(), String::new(), 1),
            ("Milk".to_string(), "1".to_string(), "cup".to_string(), 2),
        ]
    );

    let plural: String = sqlx::query_scalar("SELECT plural_name FROM ingredients WHERE name = 'Egg'")
        .fetch_one(fx.store.pool())
        .await
        .unwrap();
    assert_eq!(plural, "Egg");

    // Only the egg amount changes
    let egg_changed = PANCAKES.replace(
        r#""amount": "1", "unit": """#,
        r#""amount": "2", "unit": """#,
    );
    fx.write_recipe("recipe_r1.json", &egg_changed);
    let report = fx.run().await;
    assert_eq!(report.verification.recipe_ingredients, 3);
    assert_eq!(report.ingredients.unwrap().ingredients_created, 0);

    let lines = fx.recipe_lines(recipe_id).await;
    assert_eq!(lines[1], ("Egg".to_string(), "2".to_string(), String::new(), 1));
    assert_eq!(lines[0].1, "2");
    assert_eq!(lines[2].1, "1");
}

#[tokio::test]
async fn test_repeated_runs_converge() {
    let fx = Fixture::new().await;
    fx.write_recipe("recipe_r1.json", PANCAKES);
    fx.write_recipe(
        "recipe_r2.json",
        r#"{"id":"r2","name":"Crepes","ingredients":[{"description":"Flour","amount":"1","unit":"cup"},{"description":"Egg","amount":"3"}]}"#,
    );
    fx.write_tags(r#"{"Breakfast": {"recipes": ["r1", "r2"]}, "Quick Meals": {"recipes": ["r2", "r2"]}}"#);
    fx.insert_recipe("Pancakes").await;
    fx.insert_recipe("Crepes").await;

    fx.run().await;
    let first = fx.store.table_counts().await.unwrap();

    for _ in 0..2 {
        fx.run().await;
    }
    let after = fx.store.table_counts().await.unwrap();

    assert_eq!(first, after);
    assert_eq!(after.ingredients, 3);
    assert_eq!(after.recipe_ingredients, 5);
    assert_eq!(after.tags, 2);
    assert_eq!(after.recipe_tags, 3);

    let duplicates: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM (SELECT recipe_id, tag_id FROM recipe_tags GROUP BY recipe_id, tag_id HAVING COUNT(*) > 1)",
    )
    .fetch_one(fx.store.pool())
    .await
    .unwrap();
    assert_eq!(duplicates, 0);
}

#[tokio::test]
async fn test_shared_description_maps_to_one_ingredient() {
    let fx = Fixture::new().await;
    fx.write_recipe(
        "recipe_a.json",
        r#"{"id":"a","name":"Bread","ingredients":[{"description":"Salt "},{"description":"Flour"}]}"#,
    );
    fx.write_recipe(
        "recipe_b.json",
        r#"{"id":"b","name":"Pasta","ingredients":[{"description":"  Salt"},{"description":"Flour"}]}"#,
    );
    fx.insert_recipe("Bread").await;
    fx.insert_recipe("Pasta").await;

    fx.run().await;

    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM ingredients ORDER BY name")
        .fetch_all(fx.store.pool())
        .await
        .unwrap();
    assert_eq!(names, vec!["Flour", "Salt"]);
}

#[tokio::test]
async fn test_reorder_overwrites_positions_without_deleting() {
    let fx = Fixture::new().await;
    let recipe_id = fx.insert_recipe("Soup").await;
    fx.write_recipe(
        "recipe_s.json",
        r#"{"id":"s","name":"Soup","ingredients":[{"description":"A"},{"description":"B"},{"description":"C"}]}"#,
    );
    fx.run().await;

    fx.write_recipe(
        "recipe_s.json",
        r#"{"id":"s","name":"Soup","ingredients":[{"description":"C"},{"description":"A"}]}"#,
    );
    fx.run().await;

    let positions: Vec<(String, i32)> = fx
        .recipe_lines(recipe_id)
        .await
        .into_iter()
        .map(|(name, _, _, index)| (name, index))
        .collect();
    // B is gone from the document but its row stays
    assert_eq!(
        positions,
        vec![
            ("C".to_string(), 0),
            ("A".to_string(), 1),
            ("B".to_string(), 1),
        ]
    );
}

#[tokio::test]
async fn test_blank_description_keeps_source_positions() {
    let fx = Fixture::new().await;
    let recipe_id = fx.insert_recipe("Tea").await;
    fx.write_recipe(
        "recipe_t.json",
        r#"{"id":"t","name":"Tea","ingredients":[{"description":"Water"},{"description":"   "},{"description":"Leaves"}]}"#,
    );

    let stats = fx.run().await.ingredients.unwrap();
    assert_eq!(stats.lines_skipped, 1);
    assert_eq!(stats.lines_written, 2);

    let lines = fx.recipe_lines(recipe_id).await;
    assert_eq!(lines[0].3, 0);
    assert_eq!(lines[1], ("Leaves".to_string(), String::new(), String::new(), 2));
}

#[tokio::test]
async fn test_unresolved_recipes_are_skipped() {
    let fx = Fixture::new().await;
    fx.write_recipe("recipe_r1.json", PANCAKES);
    fx.write_tags(r#"{"Breakfast": {"recipes": ["r1", "ghost"]}}"#);
    fx.insert_recipe("pancakes").await;

    let report = fx.run().await;
    let ingredients = report.ingredients.unwrap();
    assert_eq!(ingredients.recipes_processed, 0);
    assert_eq!(ingredients.recipes_missing, 1);

    let tags = report.tags.unwrap();
    assert_eq!(tags.tags_created, 1);
    assert_eq!(tags.members_missing, 2);
    assert_eq!(tags.memberships_inserted, 0);
    assert_eq!(report.verification, RelationshipCounts::default());
    assert_eq!(fx.store.table_counts().await.unwrap().ingredients, 0);
}

#[tokio::test]
async fn test_slug_assigned_once() {
    let fx = Fixture::new().await;
    fx.write_recipe("recipe_r1.json", PANCAKES);
    fx.insert_recipe("Pancakes").await;
    sqlx::query("INSERT INTO tags (name, slug) VALUES ('Brunch', 'weekend-brunch')")
        .execute(fx.store.pool())
        .await
        .unwrap();
    fx.write_tags(r#"{"Quick Meals": {"recipes": ["r1"]}, "Brunch": {"recipes": ["r1"]}}"#);

    fx.run().await;
    fx.run().await;

    let slugs: Vec<(String, String)> = sqlx::query_as("SELECT name, slug FROM tags ORDER BY name")
        .fetch_all(fx.store.pool())
        .await
        .unwrap();
    assert_eq!(
        slugs,
        vec![
            ("Brunch".to_string(), "weekend-brunch".to_string()),
            ("Quick Meals".to_string(), "quick-meals".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_ambiguous_names_are_skipped_by_default() {
    let fx = Fixture::new().await;
    fx.write_recipe("recipe_r1.json", PANCAKES);
    fx.write_tags(r#"{"Breakfast": {"recipes": ["r1"]}}"#);
    fx.insert_recipe("Pancakes").await;
    fx.insert_recipe("Pancakes").await;

    let report = fx.run().await;
    assert_eq!(report.ingredients.unwrap().recipes_ambiguous, 1);
    assert_eq!(report.tags.unwrap().members_ambiguous, 1);
    assert_eq!(report.verification, RelationshipCounts::default());
}

#[tokio::test]
async fn test_strict_ambiguity_aborts_before_commit() {
    let mut fx = Fixture::new().await;
    fx.config.sync.fail_on_ambiguous_names = true;
    fx.write_recipe("recipe_a.json", PANCAKES);
    fx.write_recipe(
        "recipe_b.json",
        r#"{"id":"r2","name":"Chili","ingredients":[{"description":"Beans"}]}"#,
    );
    fx.insert_recipe("Pancakes").await;
    fx.insert_recipe("Chili").await;
    fx.insert_recipe("Chili").await;

    let err = fx.run_with(SyncOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::AmbiguousRecipeName(_)));

    // Pancakes were written before the failure but the phase never committed
    let counts = fx.store.table_counts().await.unwrap();
    assert_eq!(counts.ingredients, 0);
    assert_eq!(counts.recipe_ingredients, 0);
}

#[tokio::test]
async fn test_malformed_document_aborts_before_any_write() {
    let fx = Fixture::new().await;
    fx.write_recipe("recipe_r1.json", PANCAKES);
    fx.insert_recipe("Pancakes").await;
    fx.write_tags(r#"{"Breakfast": {"members": ["r1"]}}"#);

    let err = fx.run_with(SyncOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::DocumentRead { .. }));
    assert_eq!(fx.store.table_counts().await.unwrap().ingredients, 0);
}

#[tokio::test]
async fn test_dry_run_leaves_database_unchanged() {
    let fx = Fixture::new().await;
    fx.write_recipe("recipe_r1.json", PANCAKES);
    fx.write_tags(r#"{"Breakfast": {"recipes": ["r1"]}}"#);
    fx.insert_recipe("Pancakes").await;

    let report = fx
        .run_with(SyncOptions {
            dry_run: true,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.ingredients.unwrap().lines_written, 3);
    assert_eq!(report.tags.unwrap().memberships_inserted, 1);
    assert_eq!(report.verification, RelationshipCounts::default());

    let counts = fx.store.table_counts().await.unwrap();
    assert_eq!(counts.ingredients, 0);
    assert_eq!(counts.tags, 0);
}

#[tokio::test]
async fn test_single_phase_selection() {
    let fx = Fixture::new().await;
    fx.write_recipe("recipe_r1.json", PANCAKES);
    fx.write_tags(r#"{"Breakfast": {"recipes": ["r1"]}}"#);
    fx.insert_recipe("Pancakes").await;

    let report = fx
        .run_with(SyncOptions {
            phases: PhaseSelection::Tags,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(report.ingredients.is_none());
    assert_eq!(report.tags.unwrap().memberships_inserted, 1);
    assert_eq!(
        report.verification,
        RelationshipCounts {
            recipe_ingredients: 0,
            recipe_tags: 1,
        }
    );

    // The tag file is not needed when only ingredients run
    std::fs::remove_file(&fx.config.documents.tags_file).unwrap();
    let report = fx
        .run_with(SyncOptions {
            phases: PhaseSelection::Ingredients,
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(report.tags.is_none());
    assert_eq!(report.verification.recipe_ingredients, 3);
}
