//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 3;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Initial collections
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL,
        category         TEXT,
        price            REAL NOT NULL DEFAULT 0,
        stock_quantity   INTEGER NOT NULL DEFAULT 0,
        weight           INTEGER,
        description      TEXT,
        created_at       TEXT,
        updated_at       TEXT
    );

    CREATE TABLE IF NOT EXISTS carts (
        cart_id          TEXT PRIMARY KEY,
        status           TEXT NOT NULL,
        created_at       TEXT,
        updated_at       TEXT
    );

    CREATE TABLE IF NOT EXISTS sessions (
        session_id       TEXT PRIMARY KEY,
        cart_id          TEXT NOT NULL,
        status           TEXT NOT NULL,
        started_at       TEXT,
        ended_at         TEXT,
        total_cost       REAL,

        -- Line items, embedded as a JSON array
        items            JSON NOT NULL DEFAULT '[]'
    );

    CREATE TABLE IF NOT EXISTS cart_logs (
        log_id           TEXT PRIMARY KEY,
        cart_id          TEXT NOT NULL,
        ts               TEXT NOT NULL,
        action           TEXT NOT NULL,
        details          JSON NOT NULL DEFAULT '{}'
    );

    CREATE INDEX IF NOT EXISTS idx_items_category ON items(category);
    CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status);
    CREATE INDEX IF NOT EXISTS idx_sessions_cart ON sessions(cart_id);
    CREATE INDEX IF NOT EXISTS idx_cart_logs_cart_ts ON cart_logs(cart_id, ts DESC);
    "#,
    // Version 2: Cart device metadata
    r#"
    ALTER TABLE carts ADD COLUMN location TEXT;
    ALTER TABLE carts ADD COLUMN last_session_id TEXT;
    "#,
    // Version 3: Store log details as TEXT. A `JSON` column has NUMERIC
    // affinity, so bare numeric details were coerced to INTEGER/REAL.
    r#"
    CREATE TABLE cart_logs_v3 (
        log_id           TEXT PRIMARY KEY,
        cart_id          TEXT NOT NULL,
        ts               TEXT NOT NULL,
        action           TEXT NOT NULL,
        details          TEXT NOT NULL DEFAULT '{}'
    );

    INSERT INTO cart_logs_v3 (log_id, cart_id, ts, action, details)
        SELECT log_id, cart_id, ts, action, CAST(details AS TEXT) FROM cart_logs;

    DROP TABLE cart_logs;
    ALTER TABLE cart_logs_v3 RENAME TO cart_logs;

    CREATE INDEX IF NOT EXISTS idx_cart_logs_cart_ts ON cart_logs(cart_id, ts DESC);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    tracing::debug!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking migrations"
    );

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    for (idx, migration) in MIGRATIONS.iter().enumerate() {
        let version = (idx + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();

        assert!(tables.contains(&"items".to_string()));
        assert!(tables.contains(&"carts".to_string()));
        assert!(tables.contains(&"sessions".to_string()));
        assert!(tables.contains(&"cart_logs".to_string()));
    }

    #[test]
    fn test_numeric_log_details_survive_upgrade() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0]).unwrap();
        conn.execute_batch(MIGRATIONS[1]).unwrap();
        conn.execute_batch("PRAGMA user_version = 2").unwrap();
        conn.execute(
            "INSERT INTO cart_logs (log_id, cart_id, ts, action, details) VALUES ('l1', 'c1', '2025-04-21T10:00:00.000Z', 'ITEM_ADDED', '42')",
            [],
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let (kind, details): (String, String) = conn
            .query_row(
                "SELECT typeof(details), details FROM cart_logs WHERE log_id = 'l1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(kind, "text");
        assert_eq!(details, "42");
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
