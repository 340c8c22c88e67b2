//! Database schema definitions
//!
//! This module contains the SQL schema for the SQLite record store.

/// Name of the table holding harvested records
pub const RECORDS_TABLE: &str = "records";

/// SQL schema for the database
///
/// Column order matches `record::FIELD_NAMES`.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    primary_key TEXT NOT NULL,
    title TEXT NOT NULL,
    link TEXT NOT NULL,
    location TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_primary_key ON records(primary_key);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Returns true if the records table has been created
pub fn schema_exists(conn: &rusqlite::Connection) -> Result<bool, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [RECORDS_TABLE],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
