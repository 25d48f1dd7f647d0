//! Test harness for database lifecycle management.
//!
//! Provides isolated database instances per test using tempfile.

use tempfile::TempDir;

use plume::db::connection::{init_db, DbConfig, PlumeDb};
use plume::db::schema::apply_schema;

/// Test harness that manages database lifecycle.
///
/// Each TestHarness creates an isolated database in a temporary directory.
/// The database is automatically cleaned up when the harness is dropped.
pub struct TestHarness {
    /// Database connection
    pub db: PlumeDb,
    /// Temporary directory (kept alive while harness exists)
    pub temp_dir: TempDir,
}

impl TestHarness {
    /// Create a new test harness with isolated database.
    ///
    /// Panics if database initialization fails (appropriate for tests).
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory for test database");

        // Embedded default: the store lands inside the temp data directory.
        let config = DbConfig::default();
        let db = init_db(&config, temp_dir.path())
            .await
            .expect("Failed to initialize test database");

        apply_schema(&db)
            .await
            .expect("Failed to apply schema to test database");

        Self { db, temp_dir }
    }

    /// Path to the temporary directory.
    pub fn temp_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }
}
