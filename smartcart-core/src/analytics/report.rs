//! Chart-ready row shapes.
//!
//! Each shaper folds its input into buckets and projects them to rows in
//! first-occurrence order. Nothing is sorted except the low-stock report.

use super::aggregate::{
    bucketed_average, bucketed_count, bucketed_sum, category_revenue, date_key, hour_key,
    round_cents, session_amount,
};
use super::catalog::CategoryIndex;
use crate::types::{Cart, Item, Session};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateSales {
    /// `MM-DD`
    pub date: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySales {
    pub category: String,
    pub sales: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStock {
    pub category: String,
    pub stock: i64,
}

/// One slice of a status distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartSessions {
    pub cart: String,
    pub sessions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourSessions {
    /// `HH`, 00 to 23
    pub hour: String,
    pub sessions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateValue {
    /// `MM-DD`
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowStockItem {
    pub name: String,
    pub category: String,
    pub quantity: i64,
}

/// Σ totalCost per `endedAt` day.
pub fn sales_trend(completed: &[&Session]) -> Vec<DateSales> {
    bucketed_sum(
        completed.iter().copied(),
        |s| s.ended_at.as_ref().map(date_key),
        |s| session_amount(s),
    )
    .into_iter()
    .map(|(date, sales)| DateSales {
        date,
        sales: round_cents(sales),
    })
    .collect()
}

/// Line-item revenue per category.
pub fn sales_by_category(completed: &[&Session], index: &CategoryIndex) -> Vec<CategorySales> {
    category_revenue(completed.iter().copied(), index)
        .into_iter()
        .map(|(category, sales)| CategorySales {
            category,
            sales: round_cents(sales),
        })
        .collect()
}

/// Units on hand per category.
pub fn inventory_levels(items: &[Item]) -> Vec<CategoryStock> {
    let mut stock: IndexMap<&str, i64> = IndexMap::new();
    for item in items {
        *stock.entry(item.category()).or_insert(0) += item.stock_quantity;
    }
    stock
        .into_iter()
        .map(|(category, stock)| CategoryStock {
            category: category.to_string(),
            stock,
        })
        .collect()
}

pub fn cart_status(carts: &[Cart]) -> Vec<StatusCount> {
    status_rows(bucketed_count(carts, |c| Some(c.status.display_name())))
}

pub fn session_status(sessions: &[Session]) -> Vec<StatusCount> {
    status_rows(bucketed_count(sessions, |s| Some(s.status.display_name())))
}

fn status_rows(counts: IndexMap<&'static str, u64>) -> Vec<StatusCount> {
    counts
        .into_iter()
        .map(|(name, value)| StatusCount {
            name: name.to_string(),
            value,
        })
        .collect()
}

/// Session count per cart.
pub fn cart_usage(sessions: &[&Session]) -> Vec<CartSessions> {
    bucketed_count(sessions.iter().copied(), |s| Some(s.cart_id.clone()))
        .into_iter()
        .map(|(cart, sessions)| CartSessions { cart, sessions })
        .collect()
}

/// Session count per `startedAt` hour.
pub fn hourly_activity(sessions: &[&Session]) -> Vec<HourSessions> {
    bucketed_count(sessions.iter().copied(), |s| {
        s.started_at.as_ref().map(hour_key)
    })
    .into_iter()
    .map(|(hour, sessions)| HourSessions { hour, sessions })
    .collect()
}

/// Mean totalCost per `endedAt` day.
pub fn avg_session_value(completed: &[&Session]) -> Vec<DateValue> {
    bucketed_average(
        completed.iter().copied(),
        |s| s.ended_at.as_ref().map(date_key),
        |s| session_amount(s),
    )
    .into_iter()
    .map(|(date, value)| DateValue {
        date,
        value: round_cents(value),
    })
    .collect()
}

/// Items with stock strictly below `threshold`, fewest first, then by name.
pub fn low_stock(items: &[Item], threshold: i64) -> Vec<LowStockItem> {
    let mut rows: Vec<LowStockItem> = items
        .iter()
        .filter(|item| item.stock_quantity < threshold)
        .map(|item| LowStockItem {
            name: item.name.clone(),
            category: item.category().to_string(),
            quantity: item.stock_quantity,
        })
        .collect();
    rows.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.name.cmp(&b.name)));
    rows
}
