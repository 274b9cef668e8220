//! Default values for configuration
//!
//! Connection defaults honor the environment variables the recipe deployment
//! already exports, so an unconfigured run talks to the same database as the
//! web application.

use std::path::PathBuf;

/// Default MySQL host
pub fn default_db_host() -> String {
    std::env::var("RECIPE_DB_HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

/// Default MySQL port (falls back to 3306 when unset or unparsable)
pub fn default_db_port() -> u16 {
    std::env::var("RECIPE_DB_PORT")
        .ok()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(3306)
}

/// Default MySQL user
pub fn default_db_user() -> String {
    std::env::var("RECIPE_DB_USER_NAME").unwrap_or_else(|_| "recipe_user".to_string())
}

/// Default database (schema) name
pub fn default_db_name() -> String {
    std::env::var("RECIPE_DB_DATABASE_NAME").unwrap_or_else(|_| "recipe_editor".to_string())
}

/// Environment variable holding the database password
pub fn default_db_password_env() -> String {
    "RECIPE_DB_USER_PW".to_string()
}

/// Connection character set. Not configurable.
pub const DB_CHARSET: &str = "utf8mb4";

/// Seconds to wait for the connection before failing the run
pub fn default_db_connect_timeout() -> u64 {
    30
}

/// Directory holding one JSON document per recipe
pub fn default_recipes_dir() -> PathBuf {
    "data/recipes".into()
}

/// Tag-membership document
pub fn default_tags_file() -> PathBuf {
    "data/tags.json".into()
}

/// Only files named `<prefix>*.json` are treated as recipe documents
pub fn default_recipe_file_prefix() -> String {
    "recipe_".to_string()
}

/// Ambiguous recipe names are skipped, not fatal
pub fn default_fail_on_ambiguous_names() -> bool {
    false
}

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "recipe-sync.toml";
