//! Explanation history store

use super::schema::init_schema;
use crate::explain::{ExplainRequest, ExplanationResult};
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// One recorded explanation
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub language: String,
    pub code: String,
    pub result: ExplanationResult,
    pub created_at: String,
}

/// SQLite-backed explanation history
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open or create a history database
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create history directory at {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open history database at {}", path.display()))?;

        init_schema(&conn)?;

        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory history")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Default history database path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("code-explain").join("history.db"))
    }

    /// Record a finished explanation, returning its row id
    pub fn record(&mut self, request: &ExplainRequest, result: &ExplanationResult) -> Result<i64> {
        let now = chrono::Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO explanations (language, code, explanation, errors, improved_code, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                request.language().as_str(),
                request.code(),
                &result.explanation,
                &result.errors,
                &result.improved_code,
                &now,
            ),
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent explanations, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, language, code, explanation, errors, improved_code, created_at
             FROM explanations
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        let entries = stmt
            .query_map([limit as i64], |row| {
                Ok(HistoryEntry {
                    id: row.get(0)?,
                    language: row.get(1)?,
                    code: row.get(2)?,
                    result: ExplanationResult {
                        explanation: row.get(3)?,
                        errors: row.get(4)?,
                        improved_code: row.get(5)?,
                    },
                    created_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM explanations", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
