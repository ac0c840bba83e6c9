//! Snapshot import into SQLite, then the same analytics as the in-memory store.

use smartcart_core::store::{CartLogFilter, ItemFilter, SessionFilter};
use smartcart_core::{AnalyticsService, Database, MemoryStore, RecordStore, SessionStatus, Snapshot};
use tempfile::TempDir;

fn fixture() -> Snapshot {
    Snapshot::from_json(include_str!("fixtures/store.json")).expect("bad fixture")
}

fn open_db(dir: &TempDir) -> Database {
    let db = Database::open(&dir.path().join("store.db")).expect("failed to open db");
    db.migrate().expect("failed to migrate db");
    db
}

#[test]
fn import_then_analytics_match_memory_store() {
    smartcart_core::logging::init_test();
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    let summary = db.import_snapshot(fixture(), 2, |_| {}).unwrap();
    assert_eq!(summary.items, 5);
    assert_eq!(summary.carts, 4);
    assert_eq!(summary.sessions, 5);
    assert_eq!(summary.cart_logs, 3);
    // 3 + 2 + 3 + 2 chunks of at most two records
    assert_eq!(summary.batches, 10);

    let memory = MemoryStore::new(fixture());
    let from_db = AnalyticsService::new(&db);
    let from_memory = AnalyticsService::new(&memory);
    let (from, to) = (Some("2025-04-20"), Some("2025-04-21"));

    assert_eq!(
        from_db.dashboard_kpis().unwrap(),
        from_memory.dashboard_kpis().unwrap()
    );
    assert_eq!(
        from_db.analytics_kpis(None, None).unwrap(),
        from_memory.analytics_kpis(None, None).unwrap()
    );
    assert_eq!(
        from_db.sales_trend(from, to).unwrap(),
        from_memory.sales_trend(from, to).unwrap()
    );
    assert_eq!(
        from_db.sales_by_category(from, to).unwrap(),
        from_memory.sales_by_category(from, to).unwrap()
    );
    assert_eq!(
        from_db.cart_usage(from, to).unwrap(),
        from_memory.cart_usage(from, to).unwrap()
    );
    assert_eq!(
        from_db.hourly_session_activity(Some("2025-04-21")).unwrap(),
        from_memory
            .hourly_session_activity(Some("2025-04-21"))
            .unwrap()
    );
    assert_eq!(
        from_db.inventory_levels().unwrap(),
        from_memory.inventory_levels().unwrap()
    );
}

#[test]
fn reimport_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    db.import_snapshot(fixture(), 100, |_| {}).unwrap();
    let first = AnalyticsService::new(&db).dashboard_kpis().unwrap();

    let mut snapshot = fixture();
    // Logs without an ID get a fresh one on every import
    snapshot.cart_logs.retain(|l| !l.log_id.is_empty());
    db.import_snapshot(snapshot, 100, |_| {}).unwrap();

    let second = AnalyticsService::new(&db).dashboard_kpis().unwrap();
    assert_eq!(first, second);

    let (items, carts, sessions, logs) = db.collection_counts().unwrap();
    assert_eq!((items, carts, sessions, logs), (5, 4, 5, 3));
}

#[test]
fn timestamps_survive_storage() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    db.import_snapshot(fixture(), 50, |_| {}).unwrap();

    let memory = MemoryStore::new(fixture());
    let stored = db.get_session("s2").unwrap().expect("s2 imported");
    let original = memory
        .scan_sessions()
        .unwrap()
        .into_iter()
        .find(|s| s.session_id == "s2")
        .unwrap();
    assert_eq!(stored.started_at, original.started_at);
    assert_eq!(stored.items, original.items);

    let logs = db
        .list_cart_logs(&CartLogFilter {
            cart_id: Some("CART-002".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert!(!logs[0].log_id.is_empty());
}

#[test]
fn filtered_listings() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    db.import_snapshot(fixture(), 100, |_| {}).unwrap();

    let dairy = db
        .list_items(&ItemFilter {
            category: Some("Dairy".to_string()),
            ..Default::default()
        })
        .unwrap();
    let names: Vec<_> = dairy.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Cheese", "Milk"]);

    let completed = db
        .list_sessions(&SessionFilter {
            status: Some(SessionStatus::Completed),
            ..Default::default()
        })
        .unwrap();
    // Most recent first
    let ids: Vec<_> = completed.iter().map(|s| s.session_id.as_str()).collect();
    assert_eq!(ids, vec!["s5", "s2", "s1"]);

    let logs = db.list_cart_logs(&CartLogFilter::default()).unwrap();
    assert_eq!(logs[0].cart_id, "CART-002");
    assert_eq!(logs.last().unwrap().log_id, "log-1");
}
