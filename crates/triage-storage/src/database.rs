//! High-level database interface.

use std::path::PathBuf;

use async_trait::async_trait;
use directories::ProjectDirs;
use tracing::info;
use triage_core::{MemoryOutcome, MessageCategory, MisclassificationRecord, MisclassificationStore};

use crate::error::{Result, StorageError};
use crate::models::{CategoryVolume, CitationOutcomeRecord, StoredMisclassification};
use crate::pool::ConnectionPool;
use crate::repository::{CitationsRepo, MisclassificationsRepo, VolumeRepo};

/// High-level database interface for triage data.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "triage", "triage")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("triage.db"))
    }

    // === Misclassifications ===

    /// Store a human correction.
    pub fn store_misclassification(&self, record: &MisclassificationRecord) -> Result<i64> {
        if record.app_id.trim().is_empty() {
            return Err(StorageError::Config("misclassification without app id".into()));
        }

        let conn = self.pool.get()?;
        MisclassificationsRepo::insert(&conn, record)
    }

    /// Most recent corrections for an app.
    pub fn get_misclassifications(&self, app_id: &str, limit: i64) -> Result<Vec<StoredMisclassification>> {
        let conn = self.pool.get()?;
        MisclassificationsRepo::get_recent(&conn, app_id, limit)
    }

    /// Corrections previously recorded for identical text.
    pub fn find_misclassifications_for_text(
        &self,
        app_id: &str,
        text: &str,
    ) -> Result<Vec<StoredMisclassification>> {
        let conn = self.pool.get()?;
        MisclassificationsRepo::get_by_text(&conn, app_id, text)
    }

    // === Citations ===

    /// Record the outcome of memories cited during a run.
    pub fn record_citation_outcome(
        &self,
        memory_ids: &[String],
        run_id: &str,
        outcome: MemoryOutcome,
        app_id: &str,
    ) -> Result<usize> {
        let conn = self.pool.get()?;
        CitationsRepo::record(&conn, memory_ids, run_id, outcome, app_id)
    }

    /// Outcomes recorded for a run.
    pub fn get_citation_outcomes(&self, run_id: &str) -> Result<Vec<CitationOutcomeRecord>> {
        let conn = self.pool.get()?;
        CitationsRepo::get_by_run(&conn, run_id)
    }

    /// How often a memory's citations ended in failure.
    pub fn citation_failures(&self, memory_id: &str) -> Result<i64> {
        let conn = self.pool.get()?;
        CitationsRepo::count_for_memory(&conn, memory_id, MemoryOutcome::Failure)
    }

    // === Volume ===

    /// Count one more decision for a category.
    pub fn increment_category_volume(&self, app_id: &str, category: MessageCategory) -> Result<u64> {
        let conn = self.pool.get()?;
        VolumeRepo::increment(&conn, app_id, category)
    }

    /// Decisions counted for a category.
    pub fn category_volume(&self, app_id: &str, category: MessageCategory) -> Result<u64> {
        let conn = self.pool.get()?;
        VolumeRepo::get(&conn, app_id, category)
    }

    /// All category counts for an app.
    pub fn category_volumes(&self, app_id: &str) -> Result<Vec<CategoryVolume>> {
        let conn = self.pool.get()?;
        VolumeRepo::get_all(&conn, app_id)
    }
}

#[async_trait]
impl MisclassificationStore for Database {
    async fn store_misclassification(&self, record: &MisclassificationRecord) -> anyhow::Result<()> {
        Database::store_misclassification(self, record)?;
        Ok(())
    }

    async fn record_citation_outcome(
        &self,
        memory_ids: &[String],
        run_id: &str,
        outcome: MemoryOutcome,
        app_id: &str,
    ) -> anyhow::Result<()> {
        Database::record_citation_outcome(self, memory_ids, run_id, outcome, app_id)?;
        Ok(())
    }
}
