//! Check command implementation

use crate::error::Result;
use crate::store::schema::{check_schema, SchemaReport};
use crate::store::RelationalStore;

/// Compare the live schema with what a sync needs, without writing anything
pub async fn cmd_check<S: RelationalStore>(store: &S) -> Result<SchemaReport> {
    check_schema(store).await
}

/// Print schema check result to console
pub fn print_schema_report(report: &SchemaReport) {
    println!("\n🔎 Schema Check\n");

    for table in &report.tables {
        let mark = if table.is_ok() { "✓" } else { "✗" };
        if !table.exists {
            println!("  {} {} (missing)", mark, table.table);
        } else if table.missing_columns.is_empty() {
            println!("  {} {}", mark, table.table);
        } else {
            println!(
                "  {} {} (missing columns: {})",
                mark,
                table.table,
                table.missing_columns.join(", ")
            );
        }
    }

    if report.is_ok() {
        println!("\nSchema is ready for sync.");
    } else {
        println!("\n{} problem(s) found.", report.problems().len());
    }
}
