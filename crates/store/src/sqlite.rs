// Durable expression store - a .sheet file is a SQLite database

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cells (
    cell_id TEXT PRIMARY KEY,
    expr    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const FORMAT_VERSION: &str = "1";

/// Failure in the persistence layer, reported distinctly from formula
/// errors and never masked as one.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError(e.to_string())
    }
}

/// SQLite-backed `(cell id, expression)` store with a small metadata
/// table. Cell keys are canonical lowercase identifiers.
pub struct ExprStore {
    conn: Connection,
}

impl ExprStore {
    /// Open a sheet file, creating it and its schema if absent.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('format_version', ?1)",
            params![FORMAT_VERSION],
        )?;
        Ok(Self { conn })
    }

    /// Upsert the expression stored for a cell.
    pub fn set_expr(&self, cell_id: &str, expr: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO cells (cell_id, expr) VALUES (?1, ?2)
             ON CONFLICT(cell_id) DO UPDATE SET expr = excluded.expr",
            params![cell_id, expr],
        )?;
        Ok(())
    }

    /// Expression stored for a cell; empty string when absent.
    pub fn get_expr(&self, cell_id: &str) -> Result<String, StoreError> {
        let expr: Option<String> = self
            .conn
            .query_row(
                "SELECT expr FROM cells WHERE cell_id = ?1",
                params![cell_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(expr.unwrap_or_default())
    }

    /// Delete a cell's stored expression. Deleting an absent cell is
    /// not an error.
    pub fn remove_cell(&self, cell_id: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM cells WHERE cell_id = ?1", params![cell_id])?;
        Ok(())
    }

    /// Delete every stored expression.
    pub fn clear_all(&self) -> Result<(), StoreError> {
        self.conn.execute("DELETE FROM cells", [])?;
        Ok(())
    }

    /// Every stored `(cell id, expression)` pair, ordered by key.
    pub fn all_pairs(&self) -> Result<Vec<(String, String)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT cell_id, expr FROM cells ORDER BY cell_id")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut pairs = Vec::new();
        for pair in rows {
            pairs.push(pair?);
        }
        Ok(pairs)
    }

    /// Store the sheet name in metadata.
    pub fn set_name(&self, name: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO meta (key, value) VALUES ('sheet_name', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![name],
        )?;
        Ok(())
    }

    /// Stored sheet name, if one was ever set.
    pub fn name(&self) -> Option<String> {
        self.conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'sheet_name'",
                [],
                |row| row.get(0),
            )
            .ok()
    }

    /// Close the connection, surfacing flush failures instead of
    /// dropping them.
    pub fn close(self) -> Result<(), StoreError> {
        self.conn
            .close()
            .map_err(|(_, e)| StoreError(e.to_string()))
    }
}
