use rusqlite::{Connection, OptionalExtension, Result, params};

#[derive(Debug, Clone)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

impl Setting {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            [key],
            |row| row.get(0),
        ).optional()
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete(conn: &Connection, key: &str) -> Result<bool> {
        let affected = conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, migrations};
    use tempfile::{tempdir, TempDir};

    fn setup_db() -> (Database, TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        migrations::run(db.connection()).unwrap();
        (db, dir)
    }

    #[test]
    fn test_get_missing_key_returns_none() {
        let (db, _dir) = setup_db();
        assert!(Setting::get(db.connection(), "nope").unwrap().is_none());
    }

    #[test]
    fn test_set_then_get() {
        let (db, _dir) = setup_db();
        let conn = db.connection();

        Setting::set(conn, "protect_enabled", "true").unwrap();
        assert_eq!(Setting::get(conn, "protect_enabled").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn test_set_overwrites_existing() {
        let (db, _dir) = setup_db();
        let conn = db.connection();

        Setting::set(conn, "unlock_time_duration", "10").unwrap();
        Setting::set(conn, "unlock_time_duration", "30").unwrap();
        assert_eq!(Setting::get(conn, "unlock_time_duration").unwrap().as_deref(), Some("30"));
    }

    #[test]
    fn test_delete() {
        let (db, _dir) = setup_db();
        let conn = db.connection();

        Setting::set(conn, "lock_type", "pin").unwrap();
        assert!(Setting::delete(conn, "lock_type").unwrap());
        assert!(!Setting::delete(conn, "lock_type").unwrap());
        assert!(Setting::get(conn, "lock_type").unwrap().is_none());
    }
}
