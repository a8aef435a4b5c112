use rusqlite::{Connection, OptionalExtension, Result, params};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct LockedApp {
    pub id: i64,
    pub package: String,
    pub locked_at: i64,
}

impl LockedApp {
    pub fn find_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, package, locked_at FROM locked_apps ORDER BY package"
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Self {
                id: row.get(0)?,
                package: row.get(1)?,
                locked_at: row.get(2)?,
            })
        })?;

        rows.collect()
    }

    pub fn find_by_package(conn: &Connection, package: &str) -> Result<Option<Self>> {
        conn.query_row(
            "SELECT id, package, locked_at FROM locked_apps WHERE package = ?1",
            [package],
            |row| {
                Ok(Self {
                    id: row.get(0)?,
                    package: row.get(1)?,
                    locked_at: row.get(2)?,
                })
            },
        ).optional()
    }

    pub fn create(conn: &Connection, package: &str, locked_at: i64) -> Result<Self> {
        conn.execute(
            "INSERT INTO locked_apps (package, locked_at) VALUES (?1, ?2)",
            params![package, locked_at],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Self { id, package: package.to_string(), locked_at })
    }

    pub fn delete_by_package(conn: &Connection, package: &str) -> Result<bool> {
        let affected = conn.execute(
            "DELETE FROM locked_apps WHERE package = ?1",
            [package],
        )?;
        Ok(affected > 0)
    }

    pub fn packages(conn: &Connection) -> Result<HashSet<String>> {
        let mut stmt = conn.prepare("SELECT package FROM locked_apps")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect()
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
    fn test_find_all_returns_empty_when_no_locked_apps() {
        let (db, _dir) = setup_db();
        let apps = LockedApp::find_all(db.connection()).unwrap();
        assert!(apps.is_empty());
    }

    #[test]
    fn test_create_locked_app() {
        let (db, _dir) = setup_db();
        let conn = db.connection();

        let app = LockedApp::create(conn, "com.instagram.android", 1000).unwrap();

        assert_eq!(app.package, "com.instagram.android");
        assert_eq!(app.locked_at, 1000);
        assert!(app.id > 0);
    }

    #[test]
    fn test_create_duplicate_package_fails() {
        let (db, _dir) = setup_db();
        let conn = db.connection();

        LockedApp::create(conn, "com.instagram.android", 1000).unwrap();
        let result = LockedApp::create(conn, "com.instagram.android", 2000);

        assert!(result.is_err());
    }

    #[test]
    fn test_find_by_package() {
        let (db, _dir) = setup_db();
        let conn = db.connection();

        LockedApp::create(conn, "com.instagram.android", 1000).unwrap();

        let found = LockedApp::find_by_package(conn, "com.instagram.android").unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().package, "com.instagram.android");

        let missing = LockedApp::find_by_package(conn, "com.twitter.android").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_delete_by_package() {
        let (db, _dir) = setup_db();
        let conn = db.connection();

        LockedApp::create(conn, "com.instagram.android", 1000).unwrap();

        assert!(LockedApp::delete_by_package(conn, "com.instagram.android").unwrap());
        assert!(!LockedApp::delete_by_package(conn, "com.instagram.android").unwrap());
        assert!(LockedApp::find_all(conn).unwrap().is_empty());
    }

    #[test]
    fn test_packages_returns_set() {
        let (db, _dir) = setup_db();
        let conn = db.connection();

        LockedApp::create(conn, "com.instagram.android", 1000).unwrap();
        LockedApp::create(conn, "com.twitter.android", 2000).unwrap();

        let packages = LockedApp::packages(conn).unwrap();
        assert_eq!(packages.len(), 2);
        assert!(packages.contains("com.instagram.android"));
        assert!(packages.contains("com.twitter.android"));
    }

    #[test]
    fn test_find_all_ordered_by_package() {
        let (db, _dir) = setup_db();
        let conn = db.connection();

        LockedApp::create(conn, "com.zhiliaoapp.musically", 1000).unwrap();
        LockedApp::create(conn, "com.instagram.android", 2000).unwrap();

        let apps = LockedApp::find_all(conn).unwrap();
        assert_eq!(apps[0].package, "com.instagram.android");
        assert_eq!(apps[1].package, "com.zhiliaoapp.musically");
    }
}
