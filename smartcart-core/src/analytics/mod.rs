//! Analytics engine for smartcart
//!
//! Turns raw items, carts and sessions into the dashboard KPIs and chart
//! series. The pipeline is:
//! - [`catalog`]: item-id to category/price lookup
//! - [`filter`]: date ranges and session predicates
//! - [`aggregate`]: numeric folds and bucketing
//! - [`kpi`]: headline metrics
//! - [`report`]: row shapes for charts and tables
//!
//! Everything above is pure. [`service`] is the only part that reads a
//! [`RecordStore`](crate::store::RecordStore).

pub mod aggregate;
pub mod catalog;
pub mod filter;
pub mod kpi;
pub mod report;
pub mod service;

pub use catalog::CategoryIndex;
pub use filter::{filter_sessions, DateRange, SessionPredicate};
pub use kpi::{compose_kpis, AnalyticsKpis, DashboardKpis, Kpis};
pub use report::{
    CartSessions, CategorySales, CategoryStock, DateSales, DateValue, HourSessions, LowStockItem,
    StatusCount,
};
pub use service::AnalyticsService;
