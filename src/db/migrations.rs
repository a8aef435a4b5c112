use rusqlite::{Connection, Result};
use super::schema::{SCHEMA, DEFAULT_TRIGGER_EXCLUSIONS};

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    seed_default_trigger_exclusions(conn)?;
    Ok(())
}

fn seed_default_trigger_exclusions(conn: &Connection) -> Result<()> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM trigger_exclusions",
        [],
        |row| row.get(0)
    )?;

    if count == 0 {
        for package in DEFAULT_TRIGGER_EXCLUSIONS {
            conn.execute(
                "INSERT INTO trigger_exclusions (package) VALUES (?1)",
                [*package],
            )?;
        }
    }
    Ok(())
}
