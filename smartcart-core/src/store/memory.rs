//! In-memory record store over a loaded [`Snapshot`].
//!
//! Backs `--snapshot FILE` runs and tests. Scans return records in
//! snapshot order.

use crate::error::Result;
use crate::store::{RecordStore, SessionField};
use crate::types::{Cart, CartLog, Item, Session, Snapshot};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Snapshot,
}

impl MemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Load a JSON snapshot file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let snapshot = Snapshot::from_json(&text)?;
        tracing::debug!(
            path = %path.display(),
            items = snapshot.items.len(),
            carts = snapshot.carts.len(),
            sessions = snapshot.sessions.len(),
            cart_logs = snapshot.cart_logs.len(),
            "Loaded snapshot"
        );
        Ok(Self::new(snapshot))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl From<Snapshot> for MemoryStore {
    fn from(snapshot: Snapshot) -> Self {
        Self::new(snapshot)
    }
}

impl RecordStore for MemoryStore {
    fn scan_items(&self) -> Result<Vec<Item>> {
        Ok(self.snapshot.items.clone())
    }

    fn scan_carts(&self) -> Result<Vec<Cart>> {
        Ok(self.snapshot.carts.clone())
    }

    fn scan_sessions(&self) -> Result<Vec<Session>> {
        Ok(self.snapshot.sessions.clone())
    }

    fn scan_cart_logs(&self) -> Result<Vec<CartLog>> {
        Ok(self.snapshot.cart_logs.clone())
    }

    fn query_sessions(&self, field: SessionField, value: &str) -> Result<Vec<Session>> {
        Ok(self
            .snapshot
            .sessions
            .iter()
            .filter(|s| match field {
                SessionField::Status => s.status.as_str() == value,
                SessionField::CartId => s.cart_id == value,
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionStatus;

    fn session(id: &str, cart: &str, status: SessionStatus) -> Session {
        Session {
            session_id: id.to_string(),
            cart_id: cart.to_string(),
            status,
            started_at: None,
            ended_at: None,
            items: vec![],
            total_cost: None,
        }
    }

    #[test]
    fn test_query_sessions_by_field() {
        let store = MemoryStore::new(Snapshot {
            sessions: vec![
                session("s1", "c1", SessionStatus::Completed),
                session("s2", "c2", SessionStatus::Completed),
                session("s3", "c1", SessionStatus::Abandoned),
            ],
            ..Default::default()
        });

        let completed = store
            .query_sessions(SessionField::Status, "completed")
            .unwrap();
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0].session_id, "s1");

        let on_c1 = store.query_sessions(SessionField::CartId, "c1").unwrap();
        let ids: Vec<_> = on_c1.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s3"]);

        assert!(store
            .query_sessions(SessionField::Status, "paused")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(
            &path,
            r#"{"items":[{"id":"A","name":"Apple","category":"Fruits","price":2.99,"stockQuantity":4}]}"#,
        )
        .unwrap();

        let store = MemoryStore::from_path(&path).unwrap();
        assert_eq!(store.scan_items().unwrap().len(), 1);
        assert!(store.scan_sessions().unwrap().is_empty());
    }
}
