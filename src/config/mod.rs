//! Configuration management for recipe-sync
//!
//! A single [`Config`] is built at startup from an optional TOML file plus
//! environment-derived defaults, then passed by reference to every component.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Relational store connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Document store locations
    #[serde(default)]
    pub documents: DocumentsConfig,

    /// Sync behavior
    #[serde(default)]
    pub sync: SyncConfig,

    /// Where this config came from (internal)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Relational store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Full connection URL; overrides the discrete settings below.
    /// `sqlite:` URLs select the SQLite backend.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_db_user")]
    pub user: String,

    /// Database (schema) name
    #[serde(default = "default_db_name")]
    pub name: String,

    /// Environment variable name for the password
    #[serde(default = "default_db_password_env")]
    pub password_env: String,

    #[serde(default = "default_db_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Document store locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    #[serde(default = "default_recipes_dir")]
    pub recipes_dir: PathBuf,

    #[serde(default = "default_tags_file")]
    pub tags_file: PathBuf,

    #[serde(default = "default_recipe_file_prefix")]
    pub recipe_file_prefix: String,
}

/// Sync behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Abort the run instead of skipping when a recipe name is not unique
    #[serde(default = "default_fail_on_ambiguous_names")]
    pub fail_on_ambiguous_names: bool,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Config file the values were loaded from, if any
    pub config_file: Option<PathBuf>,
}

/// Relational backend selected by the connection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    MySql,
    Sqlite,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::MySql => write!(f, "mysql"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            documents: DocumentsConfig::default(),
            sync: SyncConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            name: default_db_name(),
            password_env: default_db_password_env(),
            connect_timeout_secs: default_db_connect_timeout(),
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            recipes_dir: default_recipes_dir(),
            tags_file: default_tags_file(),
            recipe_file_prefix: default_recipe_file_prefix(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fail_on_ambiguous_names: default_fail_on_ambiguous_names(),
        }
    }
}

impl DatabaseConfig {
    /// Backend implied by `url` (MySQL when no URL is set)
    pub fn backend(&self) -> Result<Backend> {
        match self.url.as_deref() {
            None => Ok(Backend::MySql),
            Some(url) if url.starts_with("sqlite:") => Ok(Backend::Sqlite),
            Some(url) if url.starts_with("mysql:") || url.starts_with("mariadb:") => {
                Ok(Backend::MySql)
            }
            Some(url) => Err(Error::Config(format!(
                "Unsupported database URL scheme: {}",
                url.split(':').next().unwrap_or(url)
            ))),
        }
    }

    /// Password from the configured environment variable (empty when unset)
    pub fn password(&self) -> String {
        std::env::var(&self.password_env).unwrap_or_default()
    }

    /// Connection target without credentials, for logs and status output
    pub fn display_target(&self) -> String {
        match &self.url {
            Some(url) => match url.split_once('@') {
                Some((_, rest)) => format!("{}://…@{}", url.split(':').next().unwrap_or(""), rest),
                None => url.clone(),
            },
            None => format!("mysql://{}@{}:{}/{}", self.user, self.host, self.port, self.name),
        }
    }
}

impl Config {
    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.paths.config_file = Some(config_path.to_path_buf());

        config.validate()?;
        Ok(config)
    }

    /// Load the explicit file if given, else `recipe-sync.toml` in the
    /// working directory if present, else environment defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load(&local);
        }

        info!("No config file found, using environment defaults");
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let backend = self.database.backend()?;

        if backend == Backend::MySql && self.database.url.is_none() {
            if self.database.name.trim().is_empty() {
                return Err(Error::Config("database.name must not be empty".to_string()));
            }
            if self.database.port == 0 {
                return Err(Error::Config("database.port must be non-zero".to_string()));
            }
        }

        if self.documents.recipes_dir.as_os_str().is_empty() {
            return Err(Error::Config(
                "documents.recipes_dir must not be empty".to_string(),
            ));
        }

        if self.documents.tags_file.as_os_str().is_empty() {
            return Err(Error::Config("documents.tags_file must not be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.documents.recipes_dir, PathBuf::from("data/recipes"));
        assert_eq!(config.documents.tags_file, PathBuf::from("data/tags.json"));
        assert_eq!(config.documents.recipe_file_prefix, "recipe_");
        assert_eq!(config.database.password_env, "RECIPE_DB_USER_PW");
        assert!(!config.sync.fail_on_ambiguous_names);
        assert_eq!(config.database.backend().unwrap(), Backend::MySql);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("recipe-sync.toml");
        std::fs::write(
            &path,
            r#"
[database]
url = "sqlite://scratch.db"

[sync]
fail_on_ambiguous_names = true
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.database.backend().unwrap(), Backend::Sqlite);
        assert!(config.sync.fail_on_ambiguous_names);
        assert_eq!(config.documents.recipe_file_prefix, "recipe_");
        assert_eq!(config.paths.config_file.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_documents_section_fills_missing_paths() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("recipe-sync.toml");
        std::fs::write(
            &path,
            r#"
[documents]
tags_file = "/srv/recipes/tags.json"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.documents.recipes_dir, PathBuf::from("data/recipes"));
        assert_eq!(
            config.documents.tags_file,
            PathBuf::from("/srv/recipes/tags.json")
        );

        std::fs::write(&path, "[documents]\nrecipes_dir = \"docs\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.documents.recipes_dir, PathBuf::from("docs"));
        assert_eq!(config.documents.tags_file, PathBuf::from("data/tags.json"));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_backend_selection() {
        let mut db = DatabaseConfig::default();
        db.url = Some("mysql://u:p@db:3306/recipes".to_string());
        assert_eq!(db.backend().unwrap(), Backend::MySql);

        db.url = Some("sqlite::memory:".to_string());
        assert_eq!(db.backend().unwrap(), Backend::Sqlite);

        db.url = Some("postgres://localhost/recipes".to_string());
        assert!(db.backend().is_err());
    }

    #[test]
    fn test_display_target_hides_credentials() {
        let mut db = DatabaseConfig::default();
        db.url = Some("mysql://admin:hunter2@db:3306/recipes".to_string());
        let shown = db.display_target();
        assert!(!shown.contains("hunter2"));
        assert!(shown.ends_with("db:3306/recipes"));
    }

    #[test]
    fn test_password_read_from_named_variable() {
        let mut db = DatabaseConfig::default();
        db.password_env = "RECIPE_SYNC_TEST_PASSWORD_VAR".to_string();
        std::env::set_var("RECIPE_SYNC_TEST_PASSWORD_VAR", "s3cret");
        assert_eq!(db.password(), "s3cret");

        db.password_env = "RECIPE_SYNC_TEST_UNSET_VAR".to_string();
        assert_eq!(db.password(), "");
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.database.name = "  ".to_string();
        assert!(config.validate().is_err());

        config.database.name = "recipe_editor".to_string();
        config.database.port = 0;
        assert!(config.validate().is_err());

        config.database.port = 3306;
        config.documents.recipes_dir = PathBuf::new();
        assert!(config.validate().is_err());

        config.documents.recipes_dir = PathBuf::from("data/recipes");
        assert!(config.validate().is_ok());
    }
}
