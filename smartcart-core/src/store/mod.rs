//! Record store layer for smartcart
//!
//! This module provides:
//! - The [`RecordStore`] trait the analytics engine reads through
//! - A SQLite implementation with embedded migrations ([`Database`])
//! - An in-memory implementation over a loaded [`Snapshot`](crate::Snapshot) ([`MemoryStore`])
//! - Timestamp normalization for everything crossing the boundary

pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod timestamp;

pub use memory::MemoryStore;
pub use sqlite::{CartLogFilter, Database, ImportSummary, ItemFilter, SessionFilter};

use crate::error::Result;
use crate::types::{Cart, CartLog, Item, Session};

/// Session fields that support an equality query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionField {
    Status,
    CartId,
}

impl SessionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionField::Status => "status",
            SessionField::CartId => "cartId",
        }
    }
}

/// Read access to the collections analytics consumes.
///
/// Scans return whole collections in no particular order. Implementations
/// must hand back fully normalized records; consumers never see raw
/// timestamps or partially decoded documents.
pub trait RecordStore: Send + Sync {
    /// Every catalog item.
    fn scan_items(&self) -> Result<Vec<Item>>;

    /// Every cart device.
    fn scan_carts(&self) -> Result<Vec<Cart>>;

    /// Every shopping session.
    fn scan_sessions(&self) -> Result<Vec<Session>>;

    /// Every cart log entry.
    fn scan_cart_logs(&self) -> Result<Vec<CartLog>>;

    /// Sessions whose `field` equals `value`.
    fn query_sessions(&self, field: SessionField, value: &str) -> Result<Vec<Session>>;
}
