//! Citation outcomes repository.

use rusqlite::{params, Connection};
use triage_core::MemoryOutcome;

use super::parse_datetime;
use crate::error::Result;
use crate::models::{parse_outcome, CitationOutcomeRecord};

/// Repository for outcomes of cited memories.
pub struct CitationsRepo;

impl CitationsRepo {
    /// Record an outcome for each memory cited in a run.
    ///
    /// A later outcome for the same memory and run replaces the earlier one.
    pub fn record(
        conn: &Connection,
        memory_ids: &[String],
        run_id: &str,
        outcome: MemoryOutcome,
        app_id: &str,
    ) -> Result<usize> {
        let mut stmt = conn.prepare(
            "INSERT INTO citation_outcomes (memory_id, run_id, app_id, outcome)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (memory_id, run_id)
             DO UPDATE SET outcome = excluded.outcome, created_at = datetime('now')",
        )?;

        let mut written = 0;
        for memory_id in memory_ids {
            written += stmt.execute(params![memory_id, run_id, app_id, outcome.as_str()])?;
        }

        Ok(written)
    }

    /// Outcomes recorded for a run.
    pub fn get_by_run(conn: &Connection, run_id: &str) -> Result<Vec<CitationOutcomeRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, memory_id, run_id, app_id, outcome, created_at
             FROM citation_outcomes WHERE run_id = ?1 ORDER BY memory_id",
        )?;

        let rows = stmt
            .query_map([run_id], |row| {
                let outcome: String = row.get(4)?;
                let Some(outcome) = parse_outcome(&outcome) else {
                    return Ok(None);
                };
                Ok(Some(CitationOutcomeRecord {
                    id: row.get(0)?,
                    memory_id: row.get(1)?,
                    run_id: row.get(2)?,
                    app_id: row.get(3)?,
                    outcome,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                }))
            })?
            .filter_map(|r| r.ok())
            .flatten()
            .collect();

        Ok(rows)
    }

    /// Count outcomes of a kind recorded against a memory.
    pub fn count_for_memory(conn: &Connection, memory_id: &str, outcome: MemoryOutcome) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM citation_outcomes WHERE memory_id = ?1 AND outcome = ?2",
            params![memory_id, outcome.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ConnectionPool;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn records_one_row_per_memory() {
        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();

        let written =
            CitationsRepo::record(&conn, &ids(&["mem_b", "mem_a"]), "run_1", MemoryOutcome::Failure, "app")
                .unwrap();
        assert_eq!(written, 2);

        let rows = CitationsRepo::get_by_run(&conn, "run_1").unwrap();
        let memories: Vec<_> = rows.iter().map(|r| r.memory_id.as_str()).collect();
        assert_eq!(memories, vec!["mem_a", "mem_b"]);
        assert!(rows.iter().all(|r| r.outcome == MemoryOutcome::Failure));
    }

    #[test]
    fn later_outcome_replaces_earlier() {
        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();

        CitationsRepo::record(&conn, &ids(&["mem_a"]), "run_1", MemoryOutcome::Success, "app").unwrap();
        CitationsRepo::record(&conn, &ids(&["mem_a"]), "run_1", MemoryOutcome::Failure, "app").unwrap();

        let rows = CitationsRepo::get_by_run(&conn, "run_1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].outcome, MemoryOutcome::Failure);
    }

    #[test]
    fn counts_across_runs() {
        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();

        CitationsRepo::record(&conn, &ids(&["mem_a"]), "run_1", MemoryOutcome::Failure, "app").unwrap();
        CitationsRepo::record(&conn, &ids(&["mem_a"]), "run_2", MemoryOutcome::Failure, "app").unwrap();
        CitationsRepo::record(&conn, &ids(&["mem_a"]), "run_3", MemoryOutcome::Success, "app").unwrap();

        assert_eq!(
            CitationsRepo::count_for_memory(&conn, "mem_a", MemoryOutcome::Failure).unwrap(),
            2
        );
        assert!(CitationsRepo::get_by_run(&conn, "run_9").unwrap().is_empty());
    }
}
