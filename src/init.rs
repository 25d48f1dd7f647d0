//! Shared initialization logic for CLI commands.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::db::connection::{init_db, DbConfig, PlumeDb};
use crate::db::schema::apply_schema;
use crate::nlp::{LocalNlpService, NlpService, NoopNlpService};
use crate::services::{LogProgressReporter, ScanCoordinator, ScanRegistry};

/// Application context holding the database handle and shared services.
pub struct AppContext {
    pub db: PlumeDb,
    pub data_path: PathBuf,
    pub nlp: Arc<dyn NlpService>,
    pub scan_registry: Arc<ScanRegistry>,
}

impl AppContext {
    /// Initialize application context.
    ///
    /// Data path priority: explicit path > `PLUME_DATA_PATH` env > `./.plume`
    /// (if it exists) > `~/.plume`. When `enable_ml` is false the NER model
    /// is never loaded and extraction runs regex-only.
    pub async fn new(explicit_path: Option<PathBuf>, enable_ml: bool) -> Result<Self> {
        let data_path = explicit_path
            .or_else(|| std::env::var("PLUME_DATA_PATH").ok().map(PathBuf::from))
            .or_else(|| {
                let local_path = Path::new(".plume");
                if local_path.exists() && local_path.is_dir() {
                    Some(local_path.to_path_buf())
                } else {
                    None
                }
            })
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".plume"))
                    .unwrap_or_else(|| PathBuf::from(".plume"))
            });

        tracing::info!("Using data path: {}", data_path.display());

        let db_config = DbConfig::load(&data_path);
        if db_config.is_embedded() {
            tracing::info!("Using embedded database");
        } else {
            tracing::info!("Connecting to remote database: {}", db_config.endpoint);
        }

        let db = init_db(&db_config, &data_path).await?;
        tracing::info!("Database connected");

        apply_schema(&db).await?;

        let nlp: Arc<dyn NlpService> = if enable_ml {
            // Model download and load are blocking; keep them off the runtime.
            let service = tokio::task::spawn_blocking(LocalNlpService::new).await?;
            Arc::new(service)
        } else {
            Arc::new(NoopNlpService::new())
        };
        if !nlp.is_available() {
            tracing::warn!("NER unavailable; extraction will run regex and heuristics only");
        }

        let scan_registry = ScanRegistry::new();

        Ok(Self {
            db,
            data_path,
            nlp,
            scan_registry,
        })
    }

    /// Scan coordinator bound to this context's registry. Stage transitions
    /// are narrated to the log stream alongside the registry updates the
    /// progress bar polls.
    pub fn scan_coordinator(&self) -> ScanCoordinator {
        ScanCoordinator::new(self.db.clone(), self.scan_registry.clone(), self.nlp.clone())
            .with_reporter(Arc::new(LogProgressReporter))
    }
}
