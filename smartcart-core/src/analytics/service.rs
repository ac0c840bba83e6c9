//! Analytics operations over a [`RecordStore`].
//!
//! Each operation validates its date parameters before touching the store,
//! fetches what it needs, then hands the records to the pure engine. Store
//! failures surface as [`Error::UpstreamUnavailable`]; nothing is retried.

use super::aggregate::sum_revenue;
use super::catalog::CategoryIndex;
use super::filter::{filter_sessions, DateRange, SessionPredicate};
use super::kpi::{
    compose_analytics_kpis, compose_kpis, count_active, AnalyticsKpis, DashboardKpis,
};
use super::report::{
    self, CartSessions, CategorySales, CategoryStock, DateSales, DateValue, HourSessions,
    LowStockItem, StatusCount,
};
use crate::config::AnalyticsConfig;
use crate::error::{Error, Result};
use crate::store::{RecordStore, SessionField};
use crate::types::{Item, Session, SessionStatus};

/// Analytics entry point borrowing a record store.
pub struct AnalyticsService<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    low_stock_threshold: i64,
}

impl<'a, S: RecordStore + ?Sized> AnalyticsService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            low_stock_threshold: AnalyticsConfig::default().low_stock_threshold,
        }
    }

    /// Use the thresholds from `[analytics]`.
    pub fn with_config(store: &'a S, config: &AnalyticsConfig) -> Self {
        Self {
            store,
            low_stock_threshold: config.low_stock_threshold,
        }
    }

    fn fetch<T>(&self, collection: &str, read: impl FnOnce(&S) -> Result<T>) -> Result<T> {
        read(self.store).map_err(|e| {
            tracing::warn!(collection, error = %e, "Record store read failed");
            Error::UpstreamUnavailable(format!("failed to read {collection}: {e}"))
        })
    }

    /// Items and sessions, read concurrently and joined before returning.
    fn fetch_items_and_sessions(&self) -> Result<(Vec<Item>, Vec<Session>)> {
        std::thread::scope(|s| {
            let items = s.spawn(|| self.fetch("items", |store| store.scan_items()));
            let sessions = self.fetch("sessions", |store| store.scan_sessions());
            let items = items.join().map_err(|_| {
                Error::UpstreamUnavailable("items reader panicked".to_string())
            })?;
            Ok((items?, sessions?))
        })
    }

    fn scan_sessions(&self) -> Result<Vec<Session>> {
        self.fetch("sessions", |store| store.scan_sessions())
    }

    /// Dashboard cards over the full snapshot.
    pub fn dashboard_kpis(&self) -> Result<DashboardKpis> {
        let (items, sessions) = self.fetch_items_and_sessions()?;
        let carts = self.fetch("carts", |store| store.scan_carts())?;
        let completed = self.fetch("sessions", |store| {
            store.query_sessions(SessionField::Status, SessionStatus::Completed.as_str())
        })?;

        Ok(DashboardKpis {
            total_items: items.len(),
            total_carts: carts.len(),
            active_sessions: count_active(&sessions),
            total_sales: sum_revenue(&completed),
        })
    }

    /// Analytics cards. With no dates, covers the full snapshot; otherwise
    /// both dates are required and sessions are ranged by `startedAt`.
    pub fn analytics_kpis(&self, from: Option<&str>, to: Option<&str>) -> Result<AnalyticsKpis> {
        let range = match (from, to) {
            (None, None) => None,
            _ => Some(DateRange::parse(from, to)?),
        };

        let (items, sessions) = self.fetch_items_and_sessions()?;
        match range {
            None => Ok(compose_kpis(&items, &[], &sessions).analytics()),
            Some(range) => {
                tracing::debug!(%range, "Composing ranged KPIs");
                let index = CategoryIndex::build(&items);
                let ranged = filter_sessions(&sessions, &SessionPredicate::StartedWithin(range));
                Ok(compose_analytics_kpis(&index, &ranged))
            }
        }
    }

    pub fn sales_trend(&self, from: Option<&str>, to: Option<&str>) -> Result<Vec<DateSales>> {
        let range = DateRange::parse(from, to)?;
        let sessions = self.scan_sessions()?;
        let completed = filter_sessions(&sessions, &SessionPredicate::completed_within(range));
        Ok(report::sales_trend(&completed))
    }

    pub fn sales_by_category(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<CategorySales>> {
        let range = DateRange::parse(from, to)?;
        let (items, sessions) = self.fetch_items_and_sessions()?;
        let index = CategoryIndex::build(&items);
        let completed = filter_sessions(&sessions, &SessionPredicate::completed_within(range));
        Ok(report::sales_by_category(&completed, &index))
    }

    pub fn inventory_levels(&self) -> Result<Vec<CategoryStock>> {
        let items = self.fetch("items", |store| store.scan_items())?;
        Ok(report::inventory_levels(&items))
    }

    /// Items below `threshold`, or the configured threshold when `None`.
    pub fn low_stock_items(&self, threshold: Option<i64>) -> Result<Vec<LowStockItem>> {
        let items = self.fetch("items", |store| store.scan_items())?;
        Ok(report::low_stock(
            &items,
            threshold.unwrap_or(self.low_stock_threshold),
        ))
    }

    pub fn cart_status(&self) -> Result<Vec<StatusCount>> {
        let carts = self.fetch("carts", |store| store.scan_carts())?;
        Ok(report::cart_status(&carts))
    }

    pub fn session_status(&self) -> Result<Vec<StatusCount>> {
        let sessions = self.scan_sessions()?;
        Ok(report::session_status(&sessions))
    }

    pub fn cart_usage(&self, from: Option<&str>, to: Option<&str>) -> Result<Vec<CartSessions>> {
        let range = DateRange::parse(from, to)?;
        let sessions = self.scan_sessions()?;
        let started = filter_sessions(&sessions, &SessionPredicate::StartedWithin(range));
        Ok(report::cart_usage(&started))
    }

    pub fn avg_session_value(&self, from: Option<&str>, to: Option<&str>) -> Result<Vec<DateValue>> {
        let range = DateRange::parse(from, to)?;
        let sessions = self.scan_sessions()?;
        let completed = filter_sessions(&sessions, &SessionPredicate::completed_within(range));
        Ok(report::avg_session_value(&completed))
    }

    pub fn hourly_session_activity(&self, date: Option<&str>) -> Result<Vec<HourSessions>> {
        let day = DateRange::for_day(date)?;
        let sessions = self.scan_sessions()?;
        let started = filter_sessions(&sessions, &SessionPredicate::StartedWithin(day));
        Ok(report::hourly_activity(&started))
    }
}
