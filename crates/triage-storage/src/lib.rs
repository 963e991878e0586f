//! Triage Storage - SQLite persistence layer.
//!
//! Stores what the triage engine learns from humans:
//!
//! - Corrections of wrong classifications (hash and preview, not full text)
//! - Outcomes of memories cited during a run
//! - Per-category decision volume, used by auto-send thresholds
//!
//! # Example
//!
//! ```no_run
//! use triage_core::MessageCategory;
//! use triage_storage::Database;
//!
//! let db = Database::in_memory().unwrap();
//! db.increment_category_volume("app_1", MessageCategory::SupportRefund).unwrap();
//! assert_eq!(db.category_volume("app_1", MessageCategory::SupportRefund).unwrap(), 1);
//! ```

mod database;
pub mod error;
pub mod models;
mod pool;
pub mod repository;
mod schema;

pub use database::Database;
pub use error::{Result, StorageError};
pub use models::{CategoryVolume, CitationOutcomeRecord, StoredMisclassification};
pub use pool::ConnectionPool;
pub use repository::{create_preview, hash_text, CitationsRepo, MisclassificationsRepo, VolumeRepo};
