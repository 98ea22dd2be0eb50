use rusqlite::{Connection, OpenFlags};

use crate::model::{self, LoaderError};

pub fn init_sqlite_connection(sqlite_file: &str) -> model::Result<Connection> {
    let conn = Connection::open_with_flags(
        sqlite_file,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )
    .map_err(LoaderError::ConnectionLost)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_row| Ok(()))?;
    configure_connection(&conn)?;
    Ok(conn)
}

/// Dependent tables reference `equity_info`; SQLite only checks that with foreign keys on.
pub fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")
}

pub fn close_connection(conn: Connection) -> model::Result<()> {
    conn.close().map_err(|(_conn, err)| LoaderError::from(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_file_with_foreign_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("equity.db");

        let conn = init_sqlite_connection(path.to_str().unwrap()).unwrap();
        let foreign_keys: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
        close_connection(conn).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unopenable_path_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("equity.db");

        let err = init_sqlite_connection(path.to_str().unwrap()).unwrap_err();
        assert!(err.is_fatal());
    }
}
