//! Sync command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::schema::check_schema;
use crate::store::RelationalStore;
use crate::sync::{SyncEngine, SyncOptions, SyncReport};
use tracing::info;

/// Check the schema, then run the selected phases
pub async fn cmd_sync<S: RelationalStore>(
    config: &Config,
    store: &S,
    options: SyncOptions,
) -> Result<SyncReport> {
    check_schema(store).await?.into_result()?;
    info!(
        "Syncing {} into {}",
        config.documents.recipes_dir.display(),
        config.database.display_target()
    );

    SyncEngine::new(store, config).run(options).await
}

/// Print sync summary to console
pub fn print_sync_report(report: &SyncReport) {
    let banner = "=".repeat(70);

    println!("{}", banner);
    if report.dry_run {
        println!("SYNCHRONIZATION DRY RUN (nothing committed)");
    } else {
        println!("SYNCHRONIZATION COMPLETE");
    }
    println!("{}", banner);

    match &report.ingredients {
        Some(stats) => {
            println!(
                "✓ Imported ingredients for {} of {} recipes",
                stats.recipes_processed, stats.documents
            );
            println!(
                "  {} lines written, {} blank lines skipped, {} new ingredients",
                stats.lines_written, stats.lines_skipped, stats.ingredients_created
            );
            if stats.recipes_missing + stats.recipes_ambiguous > 0 {
                println!(
                    "  ⚠ {} recipes not found, {} ambiguous",
                    stats.recipes_missing, stats.recipes_ambiguous
                );
            }
        }
        None => println!("- Ingredient phase skipped"),
    }

    match &report.tags {
        Some(stats) => {
            println!("✓ Imported {} tags ({} new)", stats.tags, stats.tags_created);
            println!(
                "  {} memberships seen, {} inserted",
                stats.memberships_seen, stats.memberships_inserted
            );
            if stats.members_missing + stats.members_ambiguous > 0 {
                println!(
                    "  ⚠ {} members not found, {} ambiguous",
                    stats.members_missing, stats.members_ambiguous
                );
            }
        }
        None => println!("- Tag phase skipped"),
    }

    println!(
        "✓ Total ingredients imported: {}",
        report.verification.recipe_ingredients
    );
    println!(
        "✓ Total recipe-tag relationships: {}",
        report.verification.recipe_tags
    );
}
