//! Core domain types for smartcart
//!
//! These types mirror the documents the back-office stores for the smart
//! cart fleet. They are plain data: analytics never mutates them.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Item** | A catalog product, identified by its barcode |
//! | **Cart** | A physical smart cart device |
//! | **Session** | One shopping trip on a cart, from first scan to checkout or abandonment |
//! | **LineItem** | One product entry embedded in a Session (not the catalog Item itself) |
//! | **CartLog** | An append-only activity record emitted by a cart |
//!
//! Wire format is camelCase JSON. Timestamps are normalized by
//! [`crate::store::timestamp`] before they reach any of these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::store::timestamp;

/// Category reported for items that have none or cannot be resolved.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Accepts any JSON value and keeps it only if it is a finite number.
///
/// Strings, booleans and objects in a money field are treated as absent
/// instead of failing the whole record.
fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|amount| amount.is_finite()))
}

// ============================================
// Item
// ============================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Barcode (13 digits in practice, never assumed)
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Free-form category; `None` or empty means [`UNKNOWN_CATEGORY`]
    #[serde(default)]
    pub category: Option<String>,
    /// Shelf price
    #[serde(default)]
    pub price: f64,
    /// Units on hand
    #[serde(default)]
    pub stock_quantity: i64,
    /// Weight in grams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Category with the sentinel applied.
    pub fn category(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(UNKNOWN_CATEGORY)
    }
}

// ============================================
// Cart
// ============================================

/// Operational state of a cart device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    Online,
    Offline,
    Maintenance,
}

impl CartStatus {
    pub const ALL: [CartStatus; 3] = [
        CartStatus::Online,
        CartStatus::Offline,
        CartStatus::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Online => "online",
            CartStatus::Offline => "offline",
            CartStatus::Maintenance => "maintenance",
        }
    }

    /// Label used in status distribution charts.
    pub fn display_name(&self) -> &'static str {
        match self {
            CartStatus::Online => "Online",
            CartStatus::Offline => "Offline",
            CartStatus::Maintenance => "Maintenance",
        }
    }
}

impl std::str::FromStr for CartStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(CartStatus::Online),
            "offline" => Ok(CartStatus::Offline),
            "maintenance" => Ok(CartStatus::Maintenance),
            _ => Err(format!("unknown cart status: {}", s)),
        }
    }
}

/// A smart cart device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(alias = "id")]
    pub cart_id: String,
    pub status: CartStatus,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    /// Store zone or aisle the cart was last seen in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_session_id: Option<String>,
}

// ============================================
// Session
// ============================================

/// Lifecycle state of a shopping session.
///
/// `Active` transitions once to either terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 3] = [
        SessionStatus::Active,
        SessionStatus::Completed,
        SessionStatus::Abandoned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    /// Label used in status distribution charts.
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionStatus::Active => "Active",
            SessionStatus::Completed => "Completed",
            SessionStatus::Abandoned => "Abandoned",
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "abandoned" => Ok(SessionStatus::Abandoned),
            _ => Err(format!("unknown session status: {}", s)),
        }
    }
}

/// One product entry in a session basket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// May reference an item that no longer exists in the catalog
    pub item_id: String,
    #[serde(default)]
    pub quantity: i64,
    /// Price at scan time; `None` when the record carried no usable number
    #[serde(default, deserialize_with = "lenient_amount")]
    pub unit_price: Option<f64>,
}

/// A shopping session on a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Empty when not yet assigned; the store fills it on write
    #[serde(default, alias = "id")]
    pub session_id: String,
    #[serde(default)]
    pub cart_id: String,
    pub status: SessionStatus,
    #[serde(default, with = "timestamp::option")]
    pub started_at: Option<DateTime<Utc>>,
    /// Set only once the session completes; may be absent even then
    #[serde(default, with = "timestamp::option")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Finalized basket total; non-numeric values are treated as absent
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_cost: Option<f64>,
}

impl Session {
    /// Basket total recomputed from line items, rounded to cents.
    ///
    /// Lines without a unit price contribute nothing.
    pub fn line_total(&self) -> f64 {
        let total: f64 = self
            .items
            .iter()
            .map(|line| line.quantity as f64 * line.unit_price.unwrap_or(0.0))
            .sum();
        crate::analytics::aggregate::round_cents(total)
    }
}

// ============================================
// Cart logs
// ============================================

/// Kind of activity recorded in a cart log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartAction {
    ItemAdded,
    ItemRemoved,
    QuantityChanged,
    CheckoutStarted,
    CheckoutCompleted,
    CartAbandoned,
    SessionStarted,
    ItemScanned,
}

impl CartAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartAction::ItemAdded => "ITEM_ADDED",
            CartAction::ItemRemoved => "ITEM_REMOVED",
            CartAction::QuantityChanged => "QUANTITY_CHANGED",
            CartAction::CheckoutStarted => "CHECKOUT_STARTED",
            CartAction::CheckoutCompleted => "CHECKOUT_COMPLETED",
            CartAction::CartAbandoned => "CART_ABANDONED",
            CartAction::SessionStarted => "SESSION_STARTED",
            CartAction::ItemScanned => "ITEM_SCANNED",
        }
    }
}

impl std::str::FromStr for CartAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ITEM_ADDED" => Ok(CartAction::ItemAdded),
            "ITEM_REMOVED" => Ok(CartAction::ItemRemoved),
            "QUANTITY_CHANGED" => Ok(CartAction::QuantityChanged),
            "CHECKOUT_STARTED" => Ok(CartAction::CheckoutStarted),
            "CHECKOUT_COMPLETED" => Ok(CartAction::CheckoutCompleted),
            "CART_ABANDONED" => Ok(CartAction::CartAbandoned),
            "SESSION_STARTED" => Ok(CartAction::SessionStarted),
            "ITEM_SCANNED" => Ok(CartAction::ItemScanned),
            _ => Err(format!("unknown cart action: {}", s)),
        }
    }
}

/// Append-only activity record. Displayed newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLog {
    #[serde(default, alias = "id")]
    pub log_id: String,
    pub cart_id: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub action: CartAction,
    /// Raw details; shape depends on `action`, see [`CartLog::details`]
    #[serde(default)]
    pub details: Value,
}

/// Typed view of [`CartLog::details`].
#[derive(Debug, Clone, PartialEq)]
pub enum CartLogDetails {
    /// ITEM_ADDED, ITEM_REMOVED, ITEM_SCANNED
    Item {
        item_id: String,
        name: Option<String>,
        quantity: i64,
    },
    /// QUANTITY_CHANGED
    QuantityChange {
        item_id: String,
        name: Option<String>,
        quantity: i64,
        previous_quantity: i64,
    },
    /// CHECKOUT_STARTED, CHECKOUT_COMPLETED
    Checkout { item_count: i64, total_value: f64 },
    /// CART_ABANDONED, SESSION_STARTED
    Note(Option<String>),
    /// Details that do not match the shape expected for the action
    Raw(Value),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemDetails {
    item_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    quantity: i64,
    #[serde(default)]
    previous_quantity: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutDetails {
    #[serde(default)]
    item_count: i64,
    #[serde(default)]
    total_value: f64,
}

impl CartLog {
    /// Interpret `details` according to `action`.
    pub fn details(&self) -> CartLogDetails {
        let raw = || CartLogDetails::Raw(self.details.clone());
        match self.action {
            CartAction::ItemAdded | CartAction::ItemRemoved | CartAction::ItemScanned => {
                match serde_json::from_value::<ItemDetails>(self.details.clone()) {
                    Ok(d) => CartLogDetails::Item {
                        item_id: d.item_id,
                        name: d.name,
                        quantity: d.quantity,
                    },
                    Err(_) => raw(),
                }
            }
            CartAction::QuantityChanged => {
                match serde_json::from_value::<ItemDetails>(self.details.clone()) {
                    Ok(d) => CartLogDetails::QuantityChange {
                        item_id: d.item_id,
                        name: d.name,
                        quantity: d.quantity,
                        previous_quantity: d.previous_quantity.unwrap_or(0),
                    },
                    Err(_) => raw(),
                }
            }
            CartAction::CheckoutStarted | CartAction::CheckoutCompleted => {
                match serde_json::from_value::<CheckoutDetails>(self.details.clone()) {
                    Ok(d) => CartLogDetails::Checkout {
                        item_count: d.item_count,
                        total_value: d.total_value,
                    },
                    Err(_) => raw(),
                }
            }
            CartAction::CartAbandoned | CartAction::SessionStarted => CartLogDetails::Note(
                self.details
                    .get("note")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            ),
        }
    }
}

// ============================================
// Snapshot
// ============================================

/// A full export of every collection, as produced by the seed tooling or a
/// document store dump. Missing collections default to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub carts: Vec<Cart>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub cart_logs: Vec<CartLog>,
}

impl Snapshot {
    /// Parse a snapshot from JSON text.
    pub fn from_json(text: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
