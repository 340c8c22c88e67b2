//! SQLite record store
//!
//! This module provides a SQLite-based implementation of the RecordStore
//! trait. Creating the `records` table plays the role of the CSV header: it
//! happens once, when the destination is first written.

use crate::record::Record;
use crate::storage::schema::{initialize_schema, schema_exists};
use crate::storage::traits::{RecordStore, StorageResult};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// SQLite record store backend
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (or creates) the database file at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    /// Counts the rows stored so far
    pub fn count_records(&self) -> StorageResult<u64> {
        if !schema_exists(&self.conn)? {
            return Ok(0);
        }
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Loads all stored records in insertion order
    pub fn load_records(&self) -> StorageResult<Vec<Record>> {
        if !schema_exists(&self.conn)? {
            return Ok(Vec::new());
        }

        let mut stmt = self
            .conn
            .prepare("SELECT primary_key, title, link, location FROM records ORDER BY id")?;

        let records = stmt
            .query_map([], |row| {
                Ok(Record::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

impl RecordStore for SqliteStore {
    fn destination(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => ":memory:".to_string(),
        }
    }

    fn exists(&self) -> StorageResult<bool> {
        Ok(schema_exists(&self.conn)?)
    }

    fn append(&mut self, rows: &[Record], write_header_if_new: bool) -> StorageResult<()> {
        if write_header_if_new {
            initialize_schema(&self.conn)?;
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (primary_key, title, link, location) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in rows {
                stmt.execute(params![
                    record.primary_key(),
                    record.title(),
                    record.link(),
                    record.location()
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }
}
