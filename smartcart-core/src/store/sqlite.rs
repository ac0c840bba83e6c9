//! SQLite record store
//!
//! Provides CRUD for every collection, batched snapshot import, and the
//! [`RecordStore`] scans the analytics engine reads through.

use crate::error::{Error, Result};
use crate::store::{timestamp, RecordStore, SessionField};
use crate::types::*;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Filter for item listings.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Exact category match
    pub category: Option<String>,
    /// Case-insensitive match on name or description, or substring of the barcode
    pub search: Option<String>,
    /// Maximum number of items to return
    pub limit: Option<usize>,
    /// Items to skip (for paging)
    pub offset: usize,
}

/// Filter for session listings.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    /// Filter by status
    pub status: Option<SessionStatus>,
    /// Filter by cart
    pub cart_id: Option<String>,
    /// Maximum number of sessions to return
    pub limit: Option<usize>,
    /// Sessions to skip (for paging)
    pub offset: usize,
}

/// Filter for cart log listings.
#[derive(Debug, Clone, Default)]
pub struct CartLogFilter {
    /// Filter by cart
    pub cart_id: Option<String>,
    /// Filter by action
    pub action: Option<CartAction>,
    /// Maximum number of entries to return
    pub limit: Option<usize>,
}

/// Counts written by [`Database::import_snapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub items: usize,
    pub carts: usize,
    pub sessions: usize,
    pub cart_logs: usize,
    /// Transactions committed
    pub batches: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.items + self.carts + self.sessions + self.cart_logs
    }
}

/// Record store backed by a single SQLite connection.
pub struct Database {
    conn: Mutex<Connection>,
}

fn conversion_error(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn optional_ts(value: Option<String>) -> Option<DateTime<Utc>> {
    value.as_deref().and_then(timestamp::parse_str)
}

fn storage_ts(ts: &Option<DateTime<Utc>>) -> Option<String> {
    ts.as_ref().map(timestamp::to_storage)
}

/// Appends `LIMIT`/`OFFSET` clauses.
fn push_paging(sql: &mut String, limit: Option<usize>, offset: usize) {
    match limit {
        Some(limit) => sql.push_str(&format!(" LIMIT {}", limit)),
        None if offset > 0 => sql.push_str(" LIMIT -1"),
        None => {}
    }
    if offset > 0 {
        sql.push_str(&format!(" OFFSET {}", offset));
    }
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn();
        super::schema::run_migrations(&conn)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================
    // Item operations
    // ============================================

    fn write_item(conn: &Connection, item: &Item) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO items (id, name, category, price, stock_quantity, weight,
                               description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                price = excluded.price,
                stock_quantity = excluded.stock_quantity,
                weight = excluded.weight,
                description = excluded.description,
                created_at = COALESCE(items.created_at, excluded.created_at),
                updated_at = excluded.updated_at
            "#,
            params![
                item.id,
                item.name,
                item.category,
                item.price,
                item.stock_quantity,
                item.weight,
                item.description,
                storage_ts(&item.created_at),
                storage_ts(&item.updated_at),
            ],
        )?;
        Ok(())
    }

    /// Insert or update an item
    pub fn upsert_item(&self, item: &Item) -> Result<()> {
        let conn = self.conn();
        Self::write_item(&conn, item)
    }

    /// Get an item by barcode
    pub fn get_item(&self, id: &str) -> Result<Option<Item>> {
        let conn = self.conn();
        conn.query_row("SELECT * FROM items WHERE id = ?", [id], Self::row_to_item)
            .optional()
            .map_err(Error::from)
    }

    /// List items with optional filtering, ordered by name
    pub fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        let conn = self.conn();

        let mut sql = String::from("SELECT * FROM items WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(category) = &filter.category {
            sql.push_str(" AND category = ?");
            params.push(Box::new(category.clone()));
        }

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            sql.push_str(
                " AND (instr(lower(name), ?) > 0 \
                 OR instr(lower(COALESCE(description, '')), ?) > 0 \
                 OR instr(id, ?) > 0)",
            );
            let lowered = search.to_lowercase();
            params.push(Box::new(lowered.clone()));
            params.push(Box::new(lowered));
            params.push(Box::new(search.to_string()));
        }

        sql.push_str(" ORDER BY name, id");
        push_paging(&mut sql, filter.limit, filter.offset);

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_refs.as_slice(), Self::row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Delete an item. Returns whether a row was removed.
    pub fn delete_item(&self, id: &str) -> Result<bool> {
        let conn = self.conn();
        let removed = conn.execute("DELETE FROM items WHERE id = ?", [id])?;
        Ok(removed > 0)
    }

    fn row_to_item(row: &Row) -> rusqlite::Result<Item> {
        Ok(Item {
            id: row.get("id")?,
            name: row.get("name")?,
            category: row.get("category")?,
            price: row.get("price")?,
            stock_quantity: row.get("stock_quantity")?,
            weight: row.get("weight")?,
            description: row.get("description")?,
            created_at: optional_ts(row.get("created_at")?),
            updated_at: optional_ts(row.get("updated_at")?),
        })
    }

    // ============================================
    // Cart operations
    // ============================================

    fn write_cart(conn: &Connection, cart: &Cart) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO carts (cart_id, status, created_at, updated_at, location, last_session_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(cart_id) DO UPDATE SET
                status = excluded.status,
                created_at = COALESCE(carts.created_at, excluded.created_at),
                updated_at = excluded.updated_at,
                location = COALESCE(excluded.location, carts.location),
                last_session_id = COALESCE(excluded.last_session_id, carts.last_session_id)
            "#,
            params![
                cart.cart_id,
                cart.status.as_str(),
                storage_ts(&cart.created_at),
                storage_ts(&cart.updated_at),
                cart.location,
                cart.last_session_id,
            ],
        )?;
        Ok(())
    }

    /// Insert or update a cart
    pub fn upsert_cart(&self, cart: &Cart) -> Result<()> {
        let conn = self.conn();
        Self::write_cart(&conn, cart)
    }

    /// Get a cart by ID
    pub fn get_cart(&self, cart_id: &str) -> Result<Option<Cart>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT * FROM carts WHERE cart_id = ?",
            [cart_id],
            Self::row_to_cart,
        )
        .optional()
        .map_err(Error::from)
    }

    /// List carts, optionally by status, ordered by ID
    pub fn list_carts(&self, status: Option<CartStatus>) -> Result<Vec<Cart>> {
        let conn = self.conn();
        let carts = match status {
            Some(status) => {
                let mut stmt =
                    conn.prepare("SELECT * FROM carts WHERE status = ? ORDER BY cart_id")?;
                let rows = stmt.query_map([status.as_str()], Self::row_to_cart)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare("SELECT * FROM carts ORDER BY cart_id")?;
                let rows = stmt.query_map([], Self::row_to_cart)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(carts)
    }

    /// Delete a cart. Returns whether a row was removed.
    pub fn delete_cart(&self, cart_id: &str) -> Result<bool> {
        let conn = self.conn();
        let removed = conn.execute("DELETE FROM carts WHERE cart_id = ?", [cart_id])?;
        Ok(removed > 0)
    }

    fn row_to_cart(row: &Row) -> rusqlite::Result<Cart> {
        let status: String = row.get("status")?;
        Ok(Cart {
            cart_id: row.get("cart_id")?,
            status: status.parse().map_err(|e: String| conversion_error(1, e))?,
            created_at: optional_ts(row.get("created_at")?),
            updated_at: optional_ts(row.get("updated_at")?),
            location: row.get("location")?,
            last_session_id: row.get("last_session_id")?,
        })
    }

    // ============================================
    // Session operations
    // ============================================

    fn write_session(conn: &Connection, session: &Session) -> Result<()> {
        let items = serde_json::to_string(&session.items)?;
        conn.execute(
            r#"
            INSERT INTO sessions (session_id, cart_id, status, started_at, ended_at,
                                  total_cost, items)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(session_id) DO UPDATE SET
                cart_id = excluded.cart_id,
                status = excluded.status,
                started_at = excluded.started_at,
                ended_at = excluded.ended_at,
                total_cost = excluded.total_cost,
                items = excluded.items
            "#,
            params![
                session.session_id,
                session.cart_id,
                session.status.as_str(),
                storage_ts(&session.started_at),
                storage_ts(&session.ended_at),
                session.total_cost,
                items,
            ],
        )?;
        Ok(())
    }

    /// Insert or update a session.
    ///
    /// Sessions without an ID are assigned a fresh UUID, which is returned.
    pub fn upsert_session(&self, session: &Session) -> Result<String> {
        let conn = self.conn();
        let session = Self::with_session_id(session.clone());
        Self::write_session(&conn, &session)?;
        Ok(session.session_id)
    }

    fn with_session_id(mut session: Session) -> Session {
        if session.session_id.is_empty() {
            session.session_id = uuid::Uuid::new_v4().to_string();
        }
        session
    }

    /// Get a session by ID
    pub fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT * FROM sessions WHERE session_id = ?",
            [id],
            Self::row_to_session,
        )
        .optional()
        .map_err(Error::from)
    }

    /// List sessions with optional filtering, most recent first
    pub fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        let conn = self.conn();

        let mut sql = String::from("SELECT * FROM sessions WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(status) = &filter.status {
            sql.push_str(" AND status = ?");
            params.push(Box::new(status.as_str().to_string()));
        }

        if let Some(cart_id) = &filter.cart_id {
            sql.push_str(" AND cart_id = ?");
            params.push(Box::new(cart_id.clone()));
        }

        sql.push_str(" ORDER BY started_at DESC NULLS LAST, session_id");
        push_paging(&mut sql, filter.limit, filter.offset);

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let sessions = stmt
            .query_map(params_refs.as_slice(), Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sessions)
    }

    /// Delete a session. Returns whether a row was removed.
    pub fn delete_session(&self, id: &str) -> Result<bool> {
        let conn = self.conn();
        let removed = conn.execute("DELETE FROM sessions WHERE session_id = ?", [id])?;
        Ok(removed > 0)
    }

    fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
        let status: String = row.get("status")?;
        let items: String = row.get("items")?;
        Ok(Session {
            session_id: row.get("session_id")?,
            cart_id: row.get("cart_id")?,
            status: status.parse().map_err(|e: String| conversion_error(2, e))?,
            started_at: optional_ts(row.get("started_at")?),
            ended_at: optional_ts(row.get("ended_at")?),
            items: serde_json::from_str(&items).map_err(|e| conversion_error(6, e))?,
            total_cost: row
                .get::<_, Option<f64>>("total_cost")?
                .filter(|cost| cost.is_finite()),
        })
    }

    // ============================================
    // Cart log operations
    // ============================================

    fn write_cart_log(conn: &Connection, log: &CartLog) -> Result<()> {
        // Logs are append-only: a repeated ID is ignored, never rewritten
        conn.execute(
            r#"
            INSERT OR IGNORE INTO cart_logs (log_id, cart_id, ts, action, details)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                log.log_id,
                log.cart_id,
                timestamp::to_storage(&log.timestamp),
                log.action.as_str(),
                log.details.to_string(),
            ],
        )?;
        Ok(())
    }

    fn with_log_id(mut log: CartLog) -> CartLog {
        if log.log_id.is_empty() {
            log.log_id = uuid::Uuid::new_v4().to_string();
        }
        log
    }

    /// Append a cart log entry. Returns its ID.
    pub fn append_cart_log(&self, log: &CartLog) -> Result<String> {
        let conn = self.conn();
        let log = Self::with_log_id(log.clone());
        Self::write_cart_log(&conn, &log)?;
        Ok(log.log_id)
    }

    /// List cart logs, newest first
    pub fn list_cart_logs(&self, filter: &CartLogFilter) -> Result<Vec<CartLog>> {
        let conn = self.conn();

        let mut sql = String::from("SELECT * FROM cart_logs WHERE 1=1");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(cart_id) = &filter.cart_id {
            sql.push_str(" AND cart_id = ?");
            params.push(Box::new(cart_id.clone()));
        }

        if let Some(action) = &filter.action {
            sql.push_str(" AND action = ?");
            params.push(Box::new(action.as_str().to_string()));
        }

        sql.push_str(" ORDER BY ts DESC, log_id");
        push_paging(&mut sql, filter.limit, 0);

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let logs = stmt
            .query_map(params_refs.as_slice(), Self::row_to_cart_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(logs)
    }

    fn row_to_cart_log(row: &Row) -> rusqlite::Result<CartLog> {
        let ts: String = row.get("ts")?;
        let action: String = row.get("action")?;
        let details: String = row.get("details")?;
        Ok(CartLog {
            log_id: row.get("log_id")?,
            cart_id: row.get("cart_id")?,
            timestamp: timestamp::parse_str(&ts)
                .ok_or_else(|| conversion_error(2, format!("unrecognized timestamp: {ts}")))?,
            action: action.parse().map_err(|e: String| conversion_error(3, e))?,
            details: serde_json::from_str(&details).map_err(|e| conversion_error(4, e))?,
        })
    }

    // ============================================
    // Statistics
    // ============================================

    /// Row counts per collection: (items, carts, sessions, cart_logs)
    pub fn collection_counts(&self) -> Result<(i64, i64, i64, i64)> {
        let conn = self.conn();
        let counts = conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM items),
                (SELECT COUNT(*) FROM carts),
                (SELECT COUNT(*) FROM sessions),
                (SELECT COUNT(*) FROM cart_logs)
            "#,
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )?;
        Ok(counts)
    }

    // ============================================
    // Batched import
    // ============================================

    /// Write a whole snapshot, `batch_size` records per transaction.
    ///
    /// Collections are written in dependency order (items, carts, sessions,
    /// logs). `on_batch` is called after each commit with the number of
    /// records it contained. A failed batch rolls back only itself; earlier
    /// batches stay committed.
    pub fn import_snapshot(
        &self,
        snapshot: Snapshot,
        batch_size: usize,
        mut on_batch: impl FnMut(usize),
    ) -> Result<ImportSummary> {
        let batch_size = batch_size.max(1);
        let mut conn = self.conn();
        let mut summary = ImportSummary::default();

        let sessions: Vec<Session> = snapshot
            .sessions
            .into_iter()
            .map(Self::with_session_id)
            .collect();
        let cart_logs: Vec<CartLog> = snapshot
            .cart_logs
            .into_iter()
            .map(Self::with_log_id)
            .collect();

        for chunk in snapshot.items.chunks(batch_size) {
            let tx = conn.transaction()?;
            for item in chunk {
                Self::write_item(&tx, item)?;
            }
            tx.commit()?;
            summary.items += chunk.len();
            summary.batches += 1;
            on_batch(chunk.len());
        }

        for chunk in snapshot.carts.chunks(batch_size) {
            let tx = conn.transaction()?;
            for cart in chunk {
                Self::write_cart(&tx, cart)?;
            }
            tx.commit()?;
            summary.carts += chunk.len();
            summary.batches += 1;
            on_batch(chunk.len());
        }

        for chunk in sessions.chunks(batch_size) {
            let tx = conn.transaction()?;
            for session in chunk {
                Self::write_session(&tx, session)?;
            }
            tx.commit()?;
            summary.sessions += chunk.len();
            summary.batches += 1;
            on_batch(chunk.len());
        }

        for chunk in cart_logs.chunks(batch_size) {
            let tx = conn.transaction()?;
            for log in chunk {
                Self::write_cart_log(&tx, log)?;
            }
            tx.commit()?;
            summary.cart_logs += chunk.len();
            summary.batches += 1;
            on_batch(chunk.len());
        }

        tracing::info!(
            items = summary.items,
            carts = summary.carts,
            sessions = summary.sessions,
            cart_logs = summary.cart_logs,
            batches = summary.batches,
            "Snapshot imported"
        );

        Ok(summary)
    }
}

impl RecordStore for Database {
    fn scan_items(&self) -> Result<Vec<Item>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT * FROM items ORDER BY rowid")?;
        let items = stmt
            .query_map([], Self::row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn scan_carts(&self) -> Result<Vec<Cart>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT * FROM carts ORDER BY rowid")?;
        let carts = stmt
            .query_map([], Self::row_to_cart)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(carts)
    }

    fn scan_sessions(&self) -> Result<Vec<Session>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT * FROM sessions ORDER BY rowid")?;
        let sessions = stmt
            .query_map([], Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    fn scan_cart_logs(&self) -> Result<Vec<CartLog>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT * FROM cart_logs ORDER BY rowid")?;
        let logs = stmt
            .query_map([], Self::row_to_cart_log)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }

    fn query_sessions(&self, field: SessionField, value: &str) -> Result<Vec<Session>> {
        let conn = self.conn();
        let sql = match field {
            SessionField::Status => "SELECT * FROM sessions WHERE status = ? ORDER BY rowid",
            SessionField::CartId => "SELECT * FROM sessions WHERE cart_id = ? ORDER BY rowid",
        };
        let mut stmt = conn.prepare(sql)?;
        let sessions = stmt
            .query_map([value], Self::row_to_session)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn open_test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn create_test_item(id: &str, name: &str, category: &str, stock: i64) -> Item {
        Item {
            id: id.to_string(),
            name: name.to_string(),
            category: Some(category.to_string()),
            price: 2.99,
            stock_quantity: stock,
            weight: None,
            description: Some(format!("Fresh {}", name.to_lowercase())),
            created_at: timestamp::parse_str("2025-04-15T12:00:00Z"),
            updated_at: None,
        }
    }

    fn create_test_session(id: &str, cart_id: &str, status: SessionStatus) -> Session {
        Session {
            session_id: id.to_string(),
            cart_id: cart_id.to_string(),
            status,
            started_at: timestamp::parse_str("2025-04-21T09:15:00Z"),
            ended_at: None,
            items: vec![LineItem {
                item_id: "8901234567890".to_string(),
                quantity: 2,
                unit_price: Some(2.99),
            }],
            total_cost: Some(5.98),
        }
    }

    #[test]
    fn test_item_crud() {
        let db = open_test_db();
        let item = create_test_item("8901234567890", "Apple", "Fruits", 150);

        db.upsert_item(&item).unwrap();
        let retrieved = db.get_item(&item.id).unwrap().unwrap();
        assert_eq!(retrieved, item);

        let mut updated = item.clone();
        updated.stock_quantity = 140;
        db.upsert_item(&updated).unwrap();
        assert_eq!(
            db.get_item(&item.id).unwrap().unwrap().stock_quantity,
            140
        );

        assert!(db.delete_item(&item.id).unwrap());
        assert!(!db.delete_item(&item.id).unwrap());
        assert!(db.get_item(&item.id).unwrap().is_none());
    }

    #[test]
    fn test_list_items_filters() {
        let db = open_test_db();
        db.upsert_item(&create_test_item("8901234567890", "Apple", "Fruits", 150))
            .unwrap();
        db.upsert_item(&create_test_item("8901234567891", "Milk", "Dairy", 75))
            .unwrap();
        db.upsert_item(&create_test_item("8901234567892", "Banana", "Fruits", 5))
            .unwrap();

        let fruits = db
            .list_items(&ItemFilter {
                category: Some("Fruits".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(fruits.len(), 2);
        assert_eq!(fruits[0].name, "Apple");

        let search = db
            .list_items(&ItemFilter {
                search: Some("MILK".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].id, "8901234567891");

        let by_barcode = db
            .list_items(&ItemFilter {
                search: Some("67892".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_barcode.len(), 1);
        assert_eq!(by_barcode[0].name, "Banana");

        let page = db
            .list_items(&ItemFilter {
                limit: Some(1),
                offset: 1,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Banana");
    }

    #[test]
    fn test_cart_crud() {
        let db = open_test_db();
        let cart = Cart {
            cart_id: "CART-001".to_string(),
            status: CartStatus::Online,
            created_at: timestamp::parse_str("2025-01-15"),
            updated_at: timestamp::parse_str("2025-04-21T08:45:00Z"),
            location: Some("Aisle 4".to_string()),
            last_session_id: None,
        };
        db.upsert_cart(&cart).unwrap();
        assert_eq!(db.get_cart("CART-001").unwrap().unwrap(), cart);

        let online = db.list_carts(Some(CartStatus::Online)).unwrap();
        assert_eq!(online.len(), 1);
        assert!(db.list_carts(Some(CartStatus::Offline)).unwrap().is_empty());

        assert!(db.delete_cart("CART-001").unwrap());
        assert!(db.list_carts(None).unwrap().is_empty());
    }

    #[test]
    fn test_session_crud() {
        let db = open_test_db();

        let session = create_test_session("s1", "CART-001", SessionStatus::Active);
        db.upsert_session(&session).unwrap();

        let retrieved = db.get_session("s1").unwrap().unwrap();
        assert_eq!(retrieved, session);

        let mut completed = session.clone();
        completed.status = SessionStatus::Completed;
        completed.ended_at = timestamp::parse_str("2025-04-21T09:45:00Z");
        db.upsert_session(&completed).unwrap();

        let listed = db
            .list_sessions(&SessionFilter {
                status: Some(SessionStatus::Completed),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].ended_at.is_some());

        assert!(db.delete_session("s1").unwrap());
        assert!(db.get_session("s1").unwrap().is_none());
    }

    #[test]
    fn test_upsert_session_assigns_id() {
        let db = open_test_db();
        let session = create_test_session("", "CART-002", SessionStatus::Abandoned);

        let id = db.upsert_session(&session).unwrap();
        assert!(!id.is_empty());
        assert_eq!(db.get_session(&id).unwrap().unwrap().cart_id, "CART-002");
    }

    #[test]
    fn test_cart_logs_newest_first_and_append_only() {
        let db = open_test_db();
        let older = CartLog {
            log_id: "l1".to_string(),
            cart_id: "CART-001".to_string(),
            timestamp: timestamp::parse_str("2025-04-21T10:00:00Z").unwrap(),
            action: CartAction::ItemAdded,
            details: json!({"itemId": "A", "name": "Apple", "quantity": 1}),
        };
        let newer = CartLog {
            log_id: "l2".to_string(),
            timestamp: timestamp::parse_str("2025-04-21T10:05:00Z").unwrap(),
            action: CartAction::CheckoutStarted,
            details: json!({"itemCount": 1, "totalValue": 2.99}),
            ..older.clone()
        };
        db.append_cart_log(&older).unwrap();
        db.append_cart_log(&newer).unwrap();

        // Same ID again must not overwrite
        let mut rewrite = older.clone();
        rewrite.action = CartAction::CartAbandoned;
        db.append_cart_log(&rewrite).unwrap();

        let logs = db
            .list_cart_logs(&CartLogFilter {
                cart_id: Some("CART-001".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].log_id, "l2");
        assert_eq!(logs[1].action, CartAction::ItemAdded);
    }

    #[test]
    fn test_scalar_log_details_round_trip() {
        let db = open_test_db();
        let note = CartLog {
            log_id: "l1".to_string(),
            cart_id: "CART-001".to_string(),
            timestamp: timestamp::parse_str("2025-04-21T10:00:00Z").unwrap(),
            action: CartAction::SessionStarted,
            details: json!({"note": "x"}),
        };
        let numeric = CartLog {
            log_id: "l2".to_string(),
            timestamp: timestamp::parse_str("2025-04-21T10:01:00Z").unwrap(),
            action: CartAction::ItemAdded,
            details: json!(42),
            ..note.clone()
        };
        let real = CartLog {
            log_id: "l3".to_string(),
            timestamp: timestamp::parse_str("2025-04-21T10:02:00Z").unwrap(),
            details: json!(2.5),
            ..numeric.clone()
        };

        let summary = db
            .import_snapshot(
                Snapshot {
                    cart_logs: vec![note, numeric, real],
                    ..Default::default()
                },
                100,
                |_| {},
            )
            .unwrap();
        assert_eq!(summary.cart_logs, 3);

        let scanned = db.scan_cart_logs().unwrap();
        assert_eq!(scanned.len(), 3);
        assert_eq!(scanned[1].details, json!(42));
        assert_eq!(scanned[2].details, json!(2.5));
        assert!(matches!(scanned[1].details(), CartLogDetails::Raw(_)));

        let listed = db.list_cart_logs(&CartLogFilter::default()).unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[1].details, json!(42));
    }

    #[test]
    fn test_import_snapshot_batches() {
        let db = open_test_db();
        let snapshot = Snapshot {
            items: (0..5)
                .map(|i| create_test_item(&format!("item-{i}"), "Apple", "Fruits", 10))
                .collect(),
            carts: vec![],
            sessions: vec![
                create_test_session("", "CART-001", SessionStatus::Completed),
                create_test_session("", "CART-001", SessionStatus::Active),
            ],
            cart_logs: vec![],
        };

        let mut committed = Vec::new();
        let summary = db
            .import_snapshot(snapshot, 2, |n| committed.push(n))
            .unwrap();

        assert_eq!(summary.items, 5);
        assert_eq!(summary.sessions, 2);
        assert_eq!(summary.batches, 4);
        assert_eq!(summary.total(), 7);
        assert_eq!(committed, vec![2, 2, 1, 2]);

        let (items, carts, sessions, logs) = db.collection_counts().unwrap();
        assert_eq!((items, carts, sessions, logs), (5, 0, 2, 0));
    }

    #[test]
    fn test_scans_and_query() {
        let db = open_test_db();
        db.upsert_session(&create_test_session("s1", "CART-001", SessionStatus::Completed))
            .unwrap();
        db.upsert_session(&create_test_session("s2", "CART-002", SessionStatus::Active))
            .unwrap();
        db.upsert_session(&create_test_session("s3", "CART-001", SessionStatus::Active))
            .unwrap();

        let all = db.scan_sessions().unwrap();
        let ids: Vec<_> = all.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);

        let active = db
            .query_sessions(SessionField::Status, SessionStatus::Active.as_str())
            .unwrap();
        assert_eq!(active.len(), 2);

        let on_cart = db.query_sessions(SessionField::CartId, "CART-001").unwrap();
        assert_eq!(on_cart.len(), 2);
    }
}
