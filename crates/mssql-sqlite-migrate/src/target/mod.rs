//! SQLite target store.

use crate::core::identifier::quote_sqlite;
use crate::error::{MigrateError, Result};
use rusqlite::{Connection, OpenFlags, Transaction};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A single connection to the output database file.
pub struct SqliteTarget {
    conn: Connection,
    path: PathBuf,
}

impl SqliteTarget {
    /// Open the target file, creating it if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        info!("Opened SQLite target: {}", path.display());
        Ok(Self { conn, path })
    }

    /// Check that the target can be written without creating it.
    ///
    /// An existing file must open read-write and parse as a database. A
    /// missing file needs a writable parent directory.
    pub fn check_writable(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if path.exists() {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            // Reads the header, so a non-database file fails here
            let _: i64 = conn.query_row("PRAGMA schema_version", [], |row| row.get(0))?;
            conn.close().map_err(|(_, e)| e)?;
            return Ok(());
        }

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let meta = std::fs::metadata(parent)?;
        if !meta.is_dir() || meta.permissions().readonly() {
            return Err(MigrateError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{} is not a writable directory", parent.display()),
            )));
        }
        Ok(())
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Toggle referential-integrity enforcement.
    ///
    /// SQLite ignores this pragma inside a transaction, so call it only while
    /// no transaction is open.
    pub fn set_foreign_keys(&self, enabled: bool) -> Result<()> {
        let sql = if enabled {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        debug!("{}", sql);
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn foreign_keys_enabled(&self) -> Result<bool> {
        let enabled: i64 = self
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        Ok(enabled != 0)
    }

    /// Begin the transaction that holds the whole schema and data load.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    /// Count rows reported by `PRAGMA foreign_key_check`.
    pub fn foreign_key_violations(&self) -> Result<usize> {
        let mut stmt = self.conn.prepare("PRAGMA foreign_key_check")?;
        let mut rows = stmt.query([])?;
        let mut count = 0;
        while rows.next()?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// User table names, sorted.
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Column names of a table in declaration order.
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_sqlite(table)?))?;
        let names = stmt
            .query_map([], |row| row.get(1))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn row_count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_sqlite(table)?);
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    pub fn sqlite_version(&self) -> Result<String> {
        Ok(self
            .conn
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))?)
    }

    /// Close the connection, surfacing any error SQLite reports.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e)?;
        debug!("Closed SQLite target: {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_key_toggle() {
        let target = SqliteTarget::open_in_memory().unwrap();
        target.set_foreign_keys(true).unwrap();
        assert!(target.foreign_keys_enabled().unwrap());
        target.set_foreign_keys(false).unwrap();
        assert!(!target.foreign_keys_enabled().unwrap());
    }

    #[test]
    fn test_foreign_key_violations_counted() {
        let target = SqliteTarget::open_in_memory().unwrap();
        target.set_foreign_keys(false).unwrap();
        target
            .connection()
            .execute_batch(
                r#"
                CREATE TABLE "p" ("id" INTEGER PRIMARY KEY);
                CREATE TABLE "c" ("id" INTEGER PRIMARY KEY, "p_id" INTEGER, FOREIGN KEY ("p_id") REFERENCES "p" ("id"));
                INSERT INTO "c" VALUES (1, 42), (2, 43);
                "#,
            )
            .unwrap();

        assert_eq!(target.foreign_key_violations().unwrap(), 2);
        assert_eq!(target.table_names().unwrap(), vec!["c", "p"]);
        assert_eq!(target.column_names("c").unwrap(), vec!["id", "p_id"]);
        assert_eq!(target.row_count("c").unwrap(), 2);
    }

    #[test]
    fn test_open_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.db");
        let target = SqliteTarget::open(&path).unwrap();
        assert!(path.exists());
        assert!(!target.sqlite_version().unwrap().is_empty());
        target.close().unwrap();
    }

    #[test]
    fn test_check_writable_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.db");
        SqliteTarget::check_writable(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_check_writable_existing_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("existing.db");
        SqliteTarget::open(&path).unwrap().close().unwrap();
        SqliteTarget::check_writable(&path).unwrap();
    }

    #[test]
    fn test_check_writable_rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("out.db");
        assert!(SqliteTarget::check_writable(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_check_writable_rejects_non_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");
        std::fs::write(&path, b"this is plainly not an sqlite database file at all").unwrap();
        assert!(SqliteTarget::check_writable(&path).is_err());
    }
}
