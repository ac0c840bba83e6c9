//! # smartcart-core
//!
//! Core library for smartcart - the back-office for a smart shopping cart fleet.
//!
//! This library provides:
//! - Domain types for items, carts, sessions and cart logs
//! - A record store layer with SQLite and in-memory implementations
//! - The analytics engine behind the dashboard KPIs and chart series
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through one direction only:
//! - **Store:** records are read through [`RecordStore`]; timestamps are
//!   normalized to UTC at this boundary
//! - **Engine:** pure functions in [`analytics`] index, filter, fold and shape
//!   the records
//! - **Service:** [`AnalyticsService`] fetches, validates ranges and calls the engine
//!
//! ## Example
//!
//! ```rust,no_run
//! use smartcart_core::{AnalyticsService, Config, Database};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open store
//! let db = Database::open(&config.store_path()).expect("failed to open store");
//! db.migrate().expect("failed to run migrations");
//!
//! let service = AnalyticsService::new(&db);
//! let kpis = service.dashboard_kpis().expect("store unavailable");
//! println!("total sales: {}", kpis.total_sales);
//! ```

// Re-export commonly used items at the crate root
pub use analytics::AnalyticsService;
pub use config::Config;
pub use error::{Error, Result};
pub use store::{Database, MemoryStore, RecordStore};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;
pub mod types;
