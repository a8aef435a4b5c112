use rusqlite::{Connection, Result};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct TriggerExclusion {
    pub id: i64,
    pub package: String,
}

impl TriggerExclusion {
    pub fn find_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, package FROM trigger_exclusions ORDER BY package"
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Self {
                id: row.get(0)?,
                package: row.get(1)?,
            })
        })?;

        rows.collect()
    }

    pub fn create(conn: &Connection, package: &str) -> Result<Self> {
        conn.execute(
            "INSERT INTO trigger_exclusions (package) VALUES (?1)",
            [package],
        )?;
        let id = conn.last_insert_rowid();
        Ok(Self { id, package: package.to_string() })
    }

    pub fn delete_by_package(conn: &Connection, package: &str) -> Result<bool> {
        let affected = conn.execute(
            "DELETE FROM trigger_exclusions WHERE package = ?1",
            [package],
        )?;
        Ok(affected > 0)
    }

    pub fn packages(conn: &Connection) -> Result<HashSet<String>> {
        let mut stmt = conn.prepare("SELECT package FROM trigger_exclusions")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect()
    }
}
