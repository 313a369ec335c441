//! Database schema for explanation history

use anyhow::Result;
use rusqlite::Connection;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS explanations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            language TEXT NOT NULL,
            code TEXT NOT NULL,
            explanation TEXT NOT NULL,
            errors TEXT NOT NULL,
            improved_code TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_explanations_created ON explanations(created_at);
        CREATE INDEX IF NOT EXISTS idx_explanations_language ON explanations(language);
        "#,
    )?;

    Ok(())
}
