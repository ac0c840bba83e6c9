//! Numeric folds over filtered records.
//!
//! Every function here is pure and returns finite numbers only. Buckets are
//! [`IndexMap`]s so the order in which keys were first seen is preserved;
//! buckets nothing fell into do not appear at all.

use super::catalog::CategoryIndex;
use crate::types::{LineItem, Session};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::hash::Hash;

/// Replace NaN and infinities with 0.
pub fn finite(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Round to cents, halves away from zero.
pub fn round_cents(x: f64) -> f64 {
    finite((finite(x) * 100.0).round() / 100.0)
}

/// A session's finalized total; missing or non-finite counts as 0.
pub fn session_amount(session: &Session) -> f64 {
    session.total_cost.map(finite).unwrap_or(0.0)
}

/// Σ totalCost, rounded to cents.
pub fn sum_revenue<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> f64 {
    round_cents(sessions.into_iter().map(session_amount).sum())
}

/// Mean totalCost, rounded to cents. 0 for an empty set.
pub fn average_value<'a>(sessions: impl IntoIterator<Item = &'a Session>) -> f64 {
    let (sum, count) = sessions
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), s| (sum + session_amount(s), count + 1));
    if count == 0 {
        return 0.0;
    }
    round_cents(sum / count as f64)
}

/// `part / whole × 100`, 0 when `whole` is 0. Not rounded.
pub fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    finite(part as f64 / whole as f64 * 100.0)
}

/// Sum `value` per key. Records whose key is `None` are skipped.
pub fn bucketed_sum<T, K, I>(
    records: I,
    key: impl Fn(&T) -> Option<K>,
    value: impl Fn(&T) -> f64,
) -> IndexMap<K, f64>
where
    I: IntoIterator<Item = T>,
    K: Hash + Eq,
{
    let mut buckets = IndexMap::new();
    for record in records {
        if let Some(k) = key(&record) {
            *buckets.entry(k).or_insert(0.0) += finite(value(&record));
        }
    }
    buckets
}

/// Count records per key. Records whose key is `None` are skipped.
pub fn bucketed_count<T, K, I>(records: I, key: impl Fn(&T) -> Option<K>) -> IndexMap<K, u64>
where
    I: IntoIterator<Item = T>,
    K: Hash + Eq,
{
    let mut buckets = IndexMap::new();
    for record in records {
        if let Some(k) = key(&record) {
            *buckets.entry(k).or_insert(0) += 1;
        }
    }
    buckets
}

/// Mean of `value` per key.
pub fn bucketed_average<T, K, I>(
    records: I,
    key: impl Fn(&T) -> Option<K>,
    value: impl Fn(&T) -> f64,
) -> IndexMap<K, f64>
where
    I: IntoIterator<Item = T>,
    K: Hash + Eq,
{
    let mut sums: IndexMap<K, (f64, u64)> = IndexMap::new();
    for record in records {
        if let Some(k) = key(&record) {
            let entry = sums.entry(k).or_insert((0.0, 0));
            entry.0 += finite(value(&record));
            entry.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(k, (sum, count))| (k, finite(sum / count as f64)))
        .collect()
}

/// `MM-DD` calendar day key.
pub fn date_key(ts: &DateTime<Utc>) -> String {
    ts.format("%m-%d").to_string()
}

/// Zero-padded `HH` hour key.
pub fn hour_key(ts: &DateTime<Utc>) -> String {
    ts.format("%H").to_string()
}

/// Price used for revenue: the line's own, else the catalog's, else 0.
pub fn line_price(line: &LineItem, index: &CategoryIndex) -> f64 {
    line.unit_price
        .filter(|p| p.is_finite())
        .or_else(|| index.price(&line.item_id))
        .unwrap_or(0.0)
}

fn line_category<'i>(line: &LineItem, index: &'i CategoryIndex) -> &'i str {
    if !index.contains(&line.item_id) {
        tracing::debug!(item_id = %line.item_id, "Line item references unknown catalog item");
    }
    index.category(&line.item_id)
}

/// Units sold per category over the sessions' line items.
pub fn category_quantities<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
    index: &CategoryIndex,
) -> IndexMap<String, i64> {
    let mut buckets = IndexMap::new();
    for line in sessions.into_iter().flat_map(|s| s.items.iter()) {
        *buckets
            .entry(line_category(line, index).to_string())
            .or_insert(0) += line.quantity;
    }
    buckets
}

/// Revenue (quantity × price) per category over the sessions' line items.
pub fn category_revenue<'a>(
    sessions: impl IntoIterator<Item = &'a Session>,
    index: &CategoryIndex,
) -> IndexMap<String, f64> {
    bucketed_sum(
        sessions.into_iter().flat_map(|s| s.items.iter()),
        |line| Some(line_category(line, index).to_string()),
        |line| line.quantity as f64 * line_price(line, index),
    )
}

/// Category with the strictly greatest quantity. Ties keep the first seen.
pub fn top_category(quantities: &IndexMap<String, i64>) -> Option<String> {
    let mut best: Option<(&String, i64)> = None;
    for (category, &quantity) in quantities {
        match best {
            Some((_, best_quantity)) if quantity <= best_quantity => {}
            _ => best = Some((category, quantity)),
        }
    }
    best.map(|(category, _)| category.clone())
}
