//! Misclassifications repository.

use rusqlite::{params, Connection, Row};
use sha2::{Digest, Sha256};
use triage_core::{MemoryOutcome, MessageCategory, MisclassificationRecord};

use super::parse_datetime;
use crate::error::Result;
use crate::models::{parse_outcome, parse_stage, StoredMisclassification};

/// Maximum preview length in characters.
const PREVIEW_MAX_LEN: usize = 120;

const SELECT_COLUMNS: &str = "SELECT id, app_id, conversation_id, text_hash, preview,
        original_category, corrected_category, outcome, run_id, tags, created_at, stage
     FROM misclassifications";

/// Repository for stored corrections.
pub struct MisclassificationsRepo;

impl MisclassificationsRepo {
    /// Insert a correction.
    pub fn insert(conn: &Connection, record: &MisclassificationRecord) -> Result<i64> {
        conn.execute(
            "INSERT INTO misclassifications (
                app_id, conversation_id, text_hash, preview, original_category,
                corrected_category, outcome, run_id, tags, created_at, stage)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.app_id,
                record.conversation_id,
                hash_text(&record.text),
                create_preview(&record.text),
                record.original_category.as_str(),
                record.corrected_category.as_str(),
                record.outcome.as_str(),
                record.run_id,
                serde_json::to_string(&record.tags)?,
                record.recorded_at.to_rfc3339(),
                record.stage.as_str(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Most recent corrections for an app.
    pub fn get_recent(conn: &Connection, app_id: &str, limit: i64) -> Result<Vec<StoredMisclassification>> {
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE app_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2"
        ))?;

        let rows = stmt
            .query_map(params![app_id, limit], row_to_misclassification)?
            .filter_map(|r| r.ok())
            .flatten()
            .collect();

        Ok(rows)
    }

    /// Corrections recorded for the same message text.
    pub fn get_by_text(conn: &Connection, app_id: &str, text: &str) -> Result<Vec<StoredMisclassification>> {
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE app_id = ?1 AND text_hash = ?2 ORDER BY created_at DESC"
        ))?;

        let rows = stmt
            .query_map(params![app_id, hash_text(text)], row_to_misclassification)?
            .filter_map(|r| r.ok())
            .flatten()
            .collect();

        Ok(rows)
    }

    /// Count corrections for an app.
    pub fn count(conn: &Connection, app_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM misclassifications WHERE app_id = ?1",
            [app_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Rows with unparseable categories are skipped rather than failing the query.
fn row_to_misclassification(row: &Row<'_>) -> rusqlite::Result<Option<StoredMisclassification>> {
    let original: String = row.get(5)?;
    let corrected: String = row.get(6)?;
    let outcome: String = row.get(7)?;
    let tags: String = row.get(9)?;
    let stage: String = row.get(11)?;

    let (Ok(original_category), Ok(corrected_category)) = (
        original.parse::<MessageCategory>(),
        corrected.parse::<MessageCategory>(),
    ) else {
        tracing::warn!(original = %original, corrected = %corrected, "skipping misclassification with unknown category");
        return Ok(None);
    };
    let Some(stage) = parse_stage(&stage) else {
        tracing::warn!(stage = %stage, "skipping misclassification with unknown stage");
        return Ok(None);
    };

    Ok(Some(StoredMisclassification {
        id: row.get(0)?,
        app_id: row.get(1)?,
        conversation_id: row.get(2)?,
        stage,
        text_hash: row.get(3)?,
        preview: row.get(4)?,
        original_category,
        corrected_category,
        outcome: parse_outcome(&outcome).unwrap_or(MemoryOutcome::Corrected),
        run_id: row.get(8)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        created_at: parse_datetime(&row.get::<_, String>(10)?),
    }))
}

/// Hash message text with SHA-256 (hex).
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Create a single-line preview of message text.
pub fn create_preview(text: &str) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned: String = flattened
        .chars()
        .filter(|c| !c.is_control())
        .take(PREVIEW_MAX_LEN)
        .collect();

    if flattened.chars().count() > PREVIEW_MAX_LEN {
        format!("{}...", cleaned)
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ConnectionPool;
    use chrono::{Duration, Utc};
    use triage_core::MemoryStage;

    fn record(app_id: &str, text: &str, minutes_ago: i64) -> MisclassificationRecord {
        MisclassificationRecord {
            app_id: app_id.to_string(),
            conversation_id: "cnv_1".to_string(),
            stage: MemoryStage::Classify,
            text: text.to_string(),
            original_category: MessageCategory::SupportTechnical,
            corrected_category: MessageCategory::FanMail,
            outcome: MemoryOutcome::Corrected,
            run_id: Some("run_1".to_string()),
            tags: vec!["misclassification".to_string()],
            recorded_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn insert_and_read_back() {
        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();

        let id = MisclassificationsRepo::insert(&conn, &record("app", "Loved the course!", 0)).unwrap();
        let rows = MisclassificationsRepo::get_recent(&conn, "app", 10).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].preview, "Loved the course!");
        assert_eq!(rows[0].original_category, MessageCategory::SupportTechnical);
        assert_eq!(rows[0].corrected_category, MessageCategory::FanMail);
        assert_eq!(rows[0].outcome, MemoryOutcome::Corrected);
        assert_eq!(rows[0].stage, MemoryStage::Classify);
        assert_eq!(rows[0].tags, vec!["misclassification".to_string()]);
        assert_eq!(rows[0].text_hash, hash_text("Loved the course!"));
    }

    #[test]
    fn recent_is_newest_first_and_scoped_by_app() {
        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();

        MisclassificationsRepo::insert(&conn, &record("app", "older", 10)).unwrap();
        MisclassificationsRepo::insert(&conn, &record("app", "newer", 1)).unwrap();
        MisclassificationsRepo::insert(&conn, &record("other", "elsewhere", 0)).unwrap();

        let rows = MisclassificationsRepo::get_recent(&conn, "app", 10).unwrap();
        let previews: Vec<_> = rows.iter().map(|r| r.preview.as_str()).collect();
        assert_eq!(previews, vec!["newer", "older"]);

        assert_eq!(MisclassificationsRepo::get_recent(&conn, "app", 1).unwrap().len(), 1);
        assert_eq!(MisclassificationsRepo::count(&conn, "other").unwrap(), 1);
    }

    #[test]
    fn lookup_by_text_hash() {
        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();

        MisclassificationsRepo::insert(&conn, &record("app", "Same message", 0)).unwrap();
        let rows = MisclassificationsRepo::get_by_text(&conn, "app", "  Same message\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert!(MisclassificationsRepo::get_by_text(&conn, "app", "different").unwrap().is_empty());
    }

    #[test]
    fn rows_with_unknown_categories_are_skipped() {
        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();

        conn.execute(
            "INSERT INTO misclassifications (app_id, conversation_id, text_hash, preview,
                original_category, corrected_category, outcome)
             VALUES ('app', 'c', 'h', 'p', 'retired_category', 'spam', 'corrected')",
            [],
        )
        .unwrap();

        assert!(MisclassificationsRepo::get_recent(&conn, "app", 10).unwrap().is_empty());
    }

    #[test]
    fn rows_with_unknown_stage_are_skipped() {
        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();

        MisclassificationsRepo::insert(&conn, &record("app", "kept", 1)).unwrap();
        conn.execute(
            "INSERT INTO misclassifications (app_id, conversation_id, text_hash, preview,
                original_category, corrected_category, outcome, stage)
             VALUES ('app', 'c', 'h', 'p', 'spam', 'fan_mail', 'corrected', 'retired_stage')",
            [],
        )
        .unwrap();

        let rows = MisclassificationsRepo::get_recent(&conn, "app", 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].preview, "kept");
    }

    #[test]
    fn hash_is_stable_hex() {
        let hash = hash_text("hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_text("hello"));
        assert_ne!(hash, hash_text("world"));
    }

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(create_preview("Hi\n\nI  need help"), "Hi I need help");

        let long = "word ".repeat(100);
        let preview = create_preview(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_MAX_LEN + 3);
    }
}
