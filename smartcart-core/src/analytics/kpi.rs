//! Headline metrics for the dashboard and analytics pages.

use super::aggregate::{
    average_value, category_quantities, rate, round_cents, sum_revenue, top_category,
};
use super::catalog::CategoryIndex;
use crate::types::{Cart, Item, Session, SessionStatus};
use serde::Serialize;

/// Every headline metric, computed over one session set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_items: usize,
    pub total_carts: usize,
    pub active_sessions: usize,
    pub total_sales: f64,
    pub average_session_value: f64,
    pub conversion_rate: f64,
    pub top_selling_category: Option<String>,
}

/// Dashboard cards. Always computed over the full snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardKpis {
    pub total_items: usize,
    pub total_carts: usize,
    pub active_sessions: usize,
    pub total_sales: f64,
}

/// Analytics page cards. Computed over a caller-chosen session set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsKpis {
    pub total_sales: f64,
    pub average_session_value: f64,
    /// Percentage of sessions that completed, to two decimals
    pub conversion_rate: f64,
    /// `None` when no session completed
    pub top_selling_category: Option<String>,
}

impl Kpis {
    pub fn dashboard(&self) -> DashboardKpis {
        DashboardKpis {
            total_items: self.total_items,
            total_carts: self.total_carts,
            active_sessions: self.active_sessions,
            total_sales: self.total_sales,
        }
    }

    pub fn analytics(&self) -> AnalyticsKpis {
        AnalyticsKpis {
            total_sales: self.total_sales,
            average_session_value: self.average_session_value,
            conversion_rate: self.conversion_rate,
            top_selling_category: self.top_selling_category.clone(),
        }
    }
}

/// Sales, conversion and top category over `sessions`.
///
/// Totals come from completed sessions' `totalCost`; the top category from
/// their line items.
pub fn compose_analytics_kpis(index: &CategoryIndex, sessions: &[&Session]) -> AnalyticsKpis {
    let completed: Vec<&Session> = sessions
        .iter()
        .copied()
        .filter(|s| s.status == SessionStatus::Completed)
        .collect();

    let quantities = category_quantities(completed.iter().copied(), index);

    AnalyticsKpis {
        total_sales: sum_revenue(completed.iter().copied()),
        average_session_value: average_value(completed.iter().copied()),
        conversion_rate: round_cents(rate(completed.len(), sessions.len())),
        top_selling_category: top_category(&quantities),
    }
}

/// All metrics over the full, unranged snapshot.
pub fn compose_kpis(items: &[Item], carts: &[Cart], sessions: &[Session]) -> Kpis {
    let index = CategoryIndex::build(items);
    let all: Vec<&Session> = sessions.iter().collect();
    let analytics = compose_analytics_kpis(&index, &all);

    Kpis {
        total_items: items.len(),
        total_carts: carts.len(),
        active_sessions: count_active(sessions),
        total_sales: analytics.total_sales,
        average_session_value: analytics.average_session_value,
        conversion_rate: analytics.conversion_rate,
        top_selling_category: analytics.top_selling_category,
    }
}

pub fn count_active(sessions: &[Session]) -> usize {
    sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Active)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LineItem;

    fn session(status: SessionStatus, total_cost: Option<f64>, lines: &[(&str, i64)]) -> Session {
        Session {
            session_id: "s".to_string(),
            cart_id: "c".to_string(),
            status,
            started_at: None,
            ended_at: None,
            items: lines
                .iter()
                .map(|(id, qty)| LineItem {
                    item_id: id.to_string(),
                    quantity: *qty,
                    unit_price: Some(1.0),
                })
                .collect(),
            total_cost,
        }
    }

    #[test]
    fn test_conversion_over_all_statuses() {
        let sessions = vec![
            session(SessionStatus::Active, None, &[]),
            session(SessionStatus::Completed, Some(10.0), &[]),
            session(SessionStatus::Abandoned, None, &[]),
        ];
        let kpis = compose_kpis(&[], &[], &sessions);
        assert_eq!(kpis.conversion_rate, 33.33);
        assert_eq!(kpis.total_sales, 10.0);
        assert_eq!(kpis.average_session_value, 10.0);
        assert_eq!(kpis.active_sessions, 1);
        assert_eq!(kpis.top_selling_category, None);
    }

    #[test]
    fn test_abandoned_totals_do_not_count_as_sales() {
        let sessions = vec![
            session(SessionStatus::Abandoned, Some(99.0), &[("A", 3)]),
            session(SessionStatus::Completed, Some(4.0), &[("A", 1)]),
        ];
        let kpis = compose_kpis(&[], &[], &sessions);
        assert_eq!(kpis.total_sales, 4.0);
        assert_eq!(kpis.top_selling_category.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_empty_snapshot() {
        let kpis = compose_kpis(&[], &[], &[]);
        assert_eq!(kpis.total_sales, 0.0);
        assert_eq!(kpis.average_session_value, 0.0);
        assert_eq!(kpis.conversion_rate, 0.0);
        assert_eq!(kpis.top_selling_category, None);
        assert_eq!(kpis.dashboard().total_items, 0);
    }

    #[test]
    fn test_json_shape() {
        let kpis = compose_kpis(&[], &[], &[]);
        let value = serde_json::to_value(kpis.analytics()).unwrap();
        assert!(value.get("topSellingCategory").unwrap().is_null());
        assert!(value.get("averageSessionValue").is_some());

        let value = serde_json::to_value(kpis.dashboard()).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["activeSessions", "totalCarts", "totalItems", "totalSales"]
        );
    }
}
