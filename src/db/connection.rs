//! Database connection configuration and setup.
//!
//! Plume keeps one store per data directory. The endpoint is a single
//! string: `"embedded"` (the default) opens a RocksDB store inside the data
//! directory; anything else must be a SurrealDB URL (`ws://`, `wss://`,
//! `http://`, `https://`). Namespace and database names apply to both modes
//! so a shared server can host several studios side by side.

use std::path::Path;

use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::opt::capabilities::Capabilities;
use surrealdb::Surreal;

use crate::PlumeError;

/// Unified database handle type. Works with both embedded and remote SurrealDB.
pub type PlumeDb = Surreal<Any>;

/// Endpoint value selecting the embedded store.
pub const EMBEDDED_ENDPOINT: &str = "embedded";

/// Directory name of the embedded store inside the data path.
const STORE_DIR: &str = "store";

const REMOTE_SCHEMES: [&str; 4] = ["ws://", "wss://", "http://", "https://"];

/// Database configuration.
///
/// Resolution order: `{data_path}/database.toml` supplies the base values,
/// then `PLUME_DB_URL`, `PLUME_DB_USER`, and `PLUME_DB_PASS` overlay
/// individual fields. With no file and no env vars this is the embedded
/// default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// `"embedded"` or a remote SurrealDB URL.
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    /// Remote credentials; ignored by the embedded store.
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            endpoint: EMBEDDED_ENDPOINT.to_string(),
            namespace: "plume".to_string(),
            database: "studio".to_string(),
            username: None,
            password: None,
        }
    }
}

impl DbConfig {
    /// Load config for a data directory: file base, env overlay, defaults.
    pub fn load(data_path: &Path) -> Self {
        let mut config = Self::from_file(data_path).unwrap_or_default();

        if let Ok(url) = std::env::var("PLUME_DB_URL") {
            tracing::info!("Database endpoint overridden by PLUME_DB_URL");
            config.endpoint = url;
        }
        if let Ok(user) = std::env::var("PLUME_DB_USER") {
            config.username = Some(user);
        }
        if let Ok(pass) = std::env::var("PLUME_DB_PASS") {
            config.password = Some(pass);
        }

        config
    }

    fn from_file(data_path: &Path) -> Option<Self> {
        let config_path = data_path.join("database.toml");
        if !config_path.exists() {
            return None;
        }
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<DbConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded database config from {}", config_path.display());
                    Some(config)
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse {}: {}. Using default.",
                        config_path.display(),
                        e
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read {}: {}. Using default.",
                    config_path.display(),
                    e
                );
                None
            }
        }
    }

    pub fn is_embedded(&self) -> bool {
        self.endpoint == EMBEDDED_ENDPOINT
    }

    /// Reject endpoints that are neither the embedded store nor a URL with a
    /// scheme SurrealDB speaks, and empty namespace/database names.
    pub fn validate(&self) -> Result<(), PlumeError> {
        if !self.is_embedded()
            && !REMOTE_SCHEMES
                .iter()
                .any(|scheme| self.endpoint.starts_with(scheme))
        {
            return Err(PlumeError::Validation(format!(
                "Unsupported database endpoint '{}'. Use \"{EMBEDDED_ENDPOINT}\" or a \
                 ws://, wss://, http://, or https:// URL.",
                self.endpoint
            )));
        }
        if self.namespace.trim().is_empty() || self.database.trim().is_empty() {
            return Err(PlumeError::Validation(
                "Database namespace and database names must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Connection string for `surrealdb::engine::any::connect`.
    pub fn connect_string(&self, data_path: &Path) -> String {
        if self.is_embedded() {
            format!("rocksdb:{}", data_path.join(STORE_DIR).display())
        } else {
            self.endpoint.clone()
        }
    }

    fn credentials(&self) -> (String, String) {
        (
            self.username.clone().unwrap_or_else(|| "root".to_string()),
            self.password.clone().unwrap_or_else(|| "root".to_string()),
        )
    }
}

/// Initialize and connect to the configured database.
///
/// Embedded mode opens the RocksDB store under the data directory with the
/// capabilities the engine features need; remote mode connects and signs in
/// with the configured (or default root) credentials. Both select the
/// configured namespace and database.
pub async fn init_db(config: &DbConfig, data_path: &Path) -> Result<PlumeDb, PlumeError> {
    config.validate()?;

    let db = if config.is_embedded() {
        let surreal_config = surrealdb::opt::Config::new()
            .capabilities(Capabilities::all().with_all_experimental_features_allowed());
        surrealdb::engine::any::connect((config.connect_string(data_path), surreal_config))
            .await?
    } else {
        let db = surrealdb::engine::any::connect(config.connect_string(data_path)).await?;
        let (username, password) = config.credentials();
        db.signin(surrealdb::opt::auth::Root {
            username: &username,
            password: &password,
        })
        .await?;
        db
    };

    db.use_ns(&config.namespace).use_db(&config.database).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_embedded() {
        let config = DbConfig::default();
        assert!(config.is_embedded());
        assert_eq!(config.namespace, "plume");
        assert_eq!(config.database, "studio");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connect_string_points_into_data_path() {
        let config = DbConfig::default();
        let connect = config.connect_string(Path::new("/tmp/data"));
        assert!(connect.starts_with("rocksdb:"));
        assert!(connect.ends_with("store"));
        assert!(connect.contains("/tmp/data"));
    }

    #[test]
    fn test_remote_endpoint_passes_through() {
        let config = DbConfig {
            endpoint: "wss://db.example.com:8000".to_string(),
            ..DbConfig::default()
        };
        assert!(!config.is_embedded());
        assert!(config.validate().is_ok());
        assert_eq!(
            config.connect_string(Path::new("/ignored")),
            "wss://db.example.com:8000"
        );
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let config = DbConfig {
            endpoint: "mysql://nope".to_string(),
            ..DbConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PlumeError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let config = DbConfig {
            namespace: "  ".to_string(),
            ..DbConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_parsing_with_partial_fields() {
        let parsed: DbConfig = toml::from_str(
            r#"
            endpoint = "ws://127.0.0.1:8000"
            username = "studio"
            "#,
        )
        .expect("parse");
        // Unspecified fields keep their defaults.
        assert_eq!(parsed.endpoint, "ws://127.0.0.1:8000");
        assert_eq!(parsed.namespace, "plume");
        assert_eq!(parsed.username.as_deref(), Some("studio"));
        assert!(parsed.password.is_none());
    }

    #[test]
    fn test_load_defaults_when_file_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = DbConfig::from_file(dir.path());
        assert!(config.is_none());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("database.toml"),
            "endpoint = \"embedded\"\ndatabase = \"drafts\"\n",
        )
        .expect("write config");
        let config = DbConfig::from_file(dir.path()).expect("config");
        assert!(config.is_embedded());
        assert_eq!(config.database, "drafts");
    }
}
