//! Category volume repository.
//!
//! Counts routed decisions per app and category; the router compares these
//! against each category's auto-send minimum.

use rusqlite::{params, Connection, OptionalExtension};
use triage_core::MessageCategory;

use crate::error::Result;
use crate::models::CategoryVolume;

/// Repository for per-category decision counts.
pub struct VolumeRepo;

impl VolumeRepo {
    /// Increment the count for a category and return the new value.
    pub fn increment(conn: &Connection, app_id: &str, category: MessageCategory) -> Result<u64> {
        conn.execute(
            "INSERT INTO category_volume (app_id, category, count) VALUES (?1, ?2, 1)
             ON CONFLICT (app_id, category)
             DO UPDATE SET count = count + 1, updated_at = datetime('now')",
            params![app_id, category.as_str()],
        )?;

        Self::get(conn, app_id, category)
    }

    /// Current count for a category; zero when never seen.
    pub fn get(conn: &Connection, app_id: &str, category: MessageCategory) -> Result<u64> {
        let count: Option<i64> = conn
            .query_row(
                "SELECT count FROM category_volume WHERE app_id = ?1 AND category = ?2",
                params![app_id, category.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(count.unwrap_or(0).max(0) as u64)
    }

    /// All counts for an app, highest first.
    pub fn get_all(conn: &Connection, app_id: &str) -> Result<Vec<CategoryVolume>> {
        let mut stmt = conn.prepare(
            "SELECT app_id, category, count FROM category_volume
             WHERE app_id = ?1 ORDER BY count DESC, category",
        )?;

        let rows = stmt
            .query_map([app_id], |row| {
                let category: String = row.get(1)?;
                let count: i64 = row.get(2)?;
                Ok(category.parse::<MessageCategory>().ok().map(|category| CategoryVolume {
                    app_id: app_id.to_string(),
                    category,
                    count: count.max(0) as u64,
                }))
            })?
            .filter_map(|r| r.ok())
            .flatten()
            .collect();

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ConnectionPool;

    #[test]
    fn unseen_category_is_zero() {
        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();
        assert_eq!(VolumeRepo::get(&conn, "app", MessageCategory::SupportRefund).unwrap(), 0);
    }

    #[test]
    fn increments_per_app_and_category() {
        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();

        assert_eq!(VolumeRepo::increment(&conn, "app", MessageCategory::SupportRefund).unwrap(), 1);
        assert_eq!(VolumeRepo::increment(&conn, "app", MessageCategory::SupportRefund).unwrap(), 2);
        assert_eq!(VolumeRepo::increment(&conn, "app", MessageCategory::Spam).unwrap(), 1);
        assert_eq!(VolumeRepo::increment(&conn, "other", MessageCategory::SupportRefund).unwrap(), 1);

        let all = VolumeRepo::get_all(&conn, "app").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].category, MessageCategory::SupportRefund);
        assert_eq!(all[0].count, 2);
    }
}
