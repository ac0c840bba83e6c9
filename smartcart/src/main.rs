//! smartcart - back-office analytics for the smart cart fleet
//!
//! Computes the dashboard KPIs and chart series, exports reports, and
//! inspects records in the local store.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Store: $XDG_DATA_HOME/smartcart/store.db (~/.local/share/smartcart/store.db)
//! - Logs: $XDG_STATE_HOME/smartcart/smartcart.<date>.log
//! - Config: $XDG_CONFIG_HOME/smartcart/config.toml (~/.config/smartcart/config.toml)

mod export;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use export::{ExportFormat, ReportKind};
use serde::Serialize;
use smartcart_core::analytics::DateRange;
use smartcart_core::store::{CartLogFilter, ItemFilter, SessionFilter};
use smartcart_core::{
    AnalyticsService, CartAction, CartLog, CartLogDetails, CartStatus, Config, Database, Error,
    MemoryStore, RecordStore, SessionStatus,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "smartcart")]
#[command(about = "Smart cart back-office analytics")]
#[command(version)]
struct Args {
    /// Read records from a JSON snapshot instead of the local store
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Calendar-date range; both default to the last `default_range_days` days
#[derive(clap::Args, Debug, Clone, Default)]
struct RangeArgs {
    /// First day (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    to: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Collection {
    Item,
    Cart,
    Session,
}

#[derive(Subcommand)]
enum Command {
    /// Dashboard cards: totals, active sessions and sales
    Dashboard,

    /// Analytics cards; all time unless --from/--to are given
    Kpis {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Completed-session sales per day
    SalesTrend(RangeArgs),

    /// Line-item revenue per category
    SalesByCategory(RangeArgs),

    /// Units on hand per category
    Inventory,

    /// Items below the low-stock threshold
    LowStock {
        /// Override `[analytics] low_stock_threshold`
        #[arg(short, long)]
        threshold: Option<i64>,
    },

    /// Carts per status
    CartStatus,

    /// Sessions per status
    SessionStatus,

    /// Sessions started per cart
    CartUsage(RangeArgs),

    /// Average completed-session value per day
    AvgSessionValue(RangeArgs),

    /// Sessions started per hour of one day
    Hourly {
        /// Day to report (YYYY-MM-DD, default: today UTC)
        #[arg(long)]
        date: Option<String>,
    },

    /// Export a report as CSV, Markdown or JSON
    Export {
        #[arg(value_enum)]
        kind: ReportKind,

        #[arg(value_enum, default_value = "csv")]
        export_format: ExportFormat,

        #[command(flatten)]
        range: RangeArgs,

        /// Day for the hourly activity section (default: the range's last day)
        #[arg(long)]
        date: Option<String>,

        /// Write to this file, or into this directory with a generated name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List catalog items
    Items {
        #[arg(long)]
        category: Option<String>,

        /// Match on name, description or barcode
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// List carts
    Carts {
        #[arg(long)]
        status: Option<CartStatus>,
    },

    /// List sessions, most recent first
    Sessions {
        #[arg(long)]
        status: Option<SessionStatus>,

        #[arg(long)]
        cart: Option<String>,

        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// List cart activity logs, newest first
    Logs {
        #[arg(long)]
        cart: Option<String>,

        #[arg(long)]
        action: Option<CartAction>,

        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show one record as JSON
    Show {
        #[arg(value_enum)]
        collection: Collection,
        id: String,
    },

    /// Delete one record from the local store
    Delete {
        #[arg(value_enum)]
        collection: Collection,
        id: String,
    },
}

/// Where records are read from.
enum Store {
    Local(Database),
    Snapshot(MemoryStore),
}

impl Store {
    fn open(snapshot: Option<&Path>, config: &Config) -> Result<Self> {
        if let Some(path) = snapshot {
            let store = MemoryStore::from_path(path)
                .with_context(|| format!("failed to load snapshot {}", path.display()))?;
            return Ok(Store::Snapshot(store));
        }

        let path = config.store_path();
        tracing::info!(path = %path.display(), "Opening store");
        let db = Database::open(&path).context("failed to open store")?;
        db.migrate().context("failed to run store migrations")?;
        Ok(Store::Local(db))
    }

    fn records(&self) -> &dyn RecordStore {
        match self {
            Store::Local(db) => db,
            Store::Snapshot(store) => store,
        }
    }

    fn local(&self) -> Result<&Database> {
        match self {
            Store::Local(db) => Ok(db),
            Store::Snapshot(_) => bail!("this command needs the local store; drop --snapshot"),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        smartcart_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let store = Store::open(args.snapshot.as_deref(), &config)?;
    let service = AnalyticsService::with_config(store.records(), &config.analytics);
    let today = Utc::now().date_naive();
    let days = config.analytics.default_range_days;
    let format = args.format;

    match args.command {
        Command::Dashboard => {
            let kpis = service.dashboard_kpis()?;
            emit(format, &kpis, |k| {
                println!("Total items:      {}", k.total_items);
                println!("Total carts:      {}", k.total_carts);
                println!("Active sessions:  {}", k.active_sessions);
                println!("Total sales:      ${:.2}", k.total_sales);
            })
        }
        Command::Kpis { from, to } => {
            let kpis = service.analytics_kpis(from.as_deref(), to.as_deref())?;
            emit(format, &kpis, |k| {
                println!("Total sales:            ${:.2}", k.total_sales);
                println!("Average session value:  ${:.2}", k.average_session_value);
                println!("Conversion rate:        {:.2}%", k.conversion_rate);
                println!(
                    "Top selling category:   {}",
                    k.top_selling_category.as_deref().unwrap_or("-")
                );
            })
        }
        Command::SalesTrend(range) => {
            let (from, to) = resolve_range(&range, today, days);
            let rows = service.sales_trend(from.as_deref(), to.as_deref())?;
            emit(format, &rows, |rows| {
                print_table(
                    &["Date", "Sales ($)"],
                    rows.iter()
                        .map(|r| vec![r.date.clone(), format!("{:.2}", r.sales)])
                        .collect(),
                )
            })
        }
        Command::SalesByCategory(range) => {
            let (from, to) = resolve_range(&range, today, days);
            let rows = service.sales_by_category(from.as_deref(), to.as_deref())?;
            emit(format, &rows, |rows| {
                print_table(
                    &["Category", "Sales ($)"],
                    rows.iter()
                        .map(|r| vec![r.category.clone(), format!("{:.2}", r.sales)])
                        .collect(),
                )
            })
        }
        Command::Inventory => {
            let rows = service.inventory_levels()?;
            emit(format, &rows, |rows| {
                print_table(
                    &["Category", "Stock"],
                    rows.iter()
                        .map(|r| vec![r.category.clone(), r.stock.to_string()])
                        .collect(),
                )
            })
        }
        Command::LowStock { threshold } => {
            let rows = service.low_stock_items(threshold)?;
            emit(format, &rows, |rows| {
                print_table(
                    &["Product", "Category", "Quantity"],
                    rows.iter()
                        .map(|r| vec![r.name.clone(), r.category.clone(), r.quantity.to_string()])
                        .collect(),
                )
            })
        }
        Command::CartStatus => {
            let rows = service.cart_status()?;
            emit(format, &rows, |rows| {
                print_table(
                    &["Status", "Count"],
                    rows.iter()
                        .map(|r| vec![r.name.clone(), r.value.to_string()])
                        .collect(),
                )
            })
        }
        Command::SessionStatus => {
            let rows = service.session_status()?;
            emit(format, &rows, |rows| {
                print_table(
                    &["Status", "Count"],
                    rows.iter()
                        .map(|r| vec![r.name.clone(), r.value.to_string()])
                        .collect(),
                )
            })
        }
        Command::CartUsage(range) => {
            let (from, to) = resolve_range(&range, today, days);
            let rows = service.cart_usage(from.as_deref(), to.as_deref())?;
            emit(format, &rows, |rows| {
                print_table(
                    &["Cart ID", "Sessions"],
                    rows.iter()
                        .map(|r| vec![r.cart.clone(), r.sessions.to_string()])
                        .collect(),
                )
            })
        }
        Command::AvgSessionValue(range) => {
            let (from, to) = resolve_range(&range, today, days);
            let rows = service.avg_session_value(from.as_deref(), to.as_deref())?;
            emit(format, &rows, |rows| {
                print_table(
                    &["Date", "Value ($)"],
                    rows.iter()
                        .map(|r| vec![r.date.clone(), format!("{:.2}", r.value)])
                        .collect(),
                )
            })
        }
        Command::Hourly { date } => {
            let date = date.unwrap_or_else(|| today.format("%Y-%m-%d").to_string());
            let rows = service.hourly_session_activity(Some(&date))?;
            emit(format, &rows, |rows| {
                print_table(
                    &["Hour", "Sessions"],
                    rows.iter()
                        .map(|r| vec![r.hour.clone(), r.sessions.to_string()])
                        .collect(),
                )
            })
        }
        Command::Export {
            kind,
            export_format,
            range,
            date,
            output,
        } => {
            let (from, to) = resolve_range(&range, today, days);
            let range = DateRange::parse(from.as_deref(), to.as_deref())?;
            let day = match date {
                Some(date) => DateRange::for_day(Some(&date))?.from_date(),
                None => range.to_date(),
            };
            let report = export::build_report(&service, kind, range, day, today)
                .with_context(|| format!("failed to build {} report", kind.as_str()))?;
            let rendered = export::render(&report, export_format)?;

            match output {
                None => print!("{}", rendered),
                Some(path) => {
                    let path = if path.is_dir() {
                        path.join(export::file_name(&report, export_format))
                    } else {
                        path
                    };
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), kind = kind.as_str(), "Report exported");
                    println!("Wrote {}", path.display());
                }
            }
            Ok(())
        }
        Command::Items {
            category,
            search,
            limit,
            offset,
        } => {
            let items = store.local()?.list_items(&ItemFilter {
                category,
                search,
                limit,
                offset,
            })?;
            emit(format, &items, |items| {
                print_table(
                    &["Barcode", "Name", "Category", "Price", "Stock"],
                    items
                        .iter()
                        .map(|i| {
                            vec![
                                i.id.clone(),
                                i.name.clone(),
                                i.category().to_string(),
                                format!("{:.2}", i.price),
                                i.stock_quantity.to_string(),
                            ]
                        })
                        .collect(),
                )
            })
        }
        Command::Carts { status } => {
            let carts = store.local()?.list_carts(status)?;
            emit(format, &carts, |carts| {
                print_table(
                    &["Cart ID", "Status", "Location", "Last session"],
                    carts
                        .iter()
                        .map(|c| {
                            vec![
                                c.cart_id.clone(),
                                c.status.display_name().to_string(),
                                c.location.clone().unwrap_or_default(),
                                c.last_session_id.clone().unwrap_or_default(),
                            ]
                        })
                        .collect(),
                )
            })
        }
        Command::Sessions {
            status,
            cart,
            limit,
            offset,
        } => {
            let sessions = store.local()?.list_sessions(&SessionFilter {
                status,
                cart_id: cart,
                limit,
                offset,
            })?;
            emit(format, &sessions, |sessions| {
                print_table(
                    &["Session", "Cart", "Status", "Started", "Items", "Total ($)"],
                    sessions
                        .iter()
                        .map(|s| {
                            vec![
                                s.session_id.clone(),
                                s.cart_id.clone(),
                                s.status.display_name().to_string(),
                                s.started_at
                                    .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
                                    .unwrap_or_default(),
                                s.items.len().to_string(),
                                // Open baskets have no total yet; show the running line total
                                format!("{:.2}", s.total_cost.unwrap_or_else(|| s.line_total())),
                            ]
                        })
                        .collect(),
                )
            })
        }
        Command::Logs {
            cart,
            action,
            limit,
        } => {
            let filter = CartLogFilter {
                cart_id: cart,
                action,
                limit: Some(limit),
            };
            let logs = match &store {
                Store::Local(db) => db.list_cart_logs(&filter)?,
                Store::Snapshot(snapshot) => filter_logs(snapshot.scan_cart_logs()?, &filter),
            };
            emit(format, &logs, |logs| {
                print_table(
                    &["Time", "Cart", "Action", "Details"],
                    logs.iter()
                        .map(|l| {
                            vec![
                                l.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                                l.cart_id.clone(),
                                l.action.as_str().to_string(),
                                describe_details(&l.details()),
                            ]
                        })
                        .collect(),
                )
            })
        }
        Command::Show { collection, id } => {
            let db = store.local()?;
            let record = match collection {
                Collection::Item => db.get_item(&id)?.map(serde_json::to_value),
                Collection::Cart => db.get_cart(&id)?.map(serde_json::to_value),
                Collection::Session => db.get_session(&id)?.map(serde_json::to_value),
            };
            match record {
                Some(value) => {
                    println!("{}", serde_json::to_string_pretty(&value?)?);
                    Ok(())
                }
                None => Err(not_found(collection, id).into()),
            }
        }
        Command::Delete { collection, id } => {
            let db = store.local()?;
            let removed = match collection {
                Collection::Item => db.delete_item(&id)?,
                Collection::Cart => db.delete_cart(&id)?,
                Collection::Session => db.delete_session(&id)?,
            };
            if !removed {
                return Err(not_found(collection, id).into());
            }
            tracing::info!(collection = collection_name(collection), %id, "Record deleted");
            println!("Deleted {} {}", collection_name(collection), id);
            Ok(())
        }
    }
}

fn describe_details(details: &CartLogDetails) -> String {
    match details {
        CartLogDetails::Item {
            item_id,
            name,
            quantity,
        } => format!("{} x{}", name.as_deref().unwrap_or(item_id), quantity),
        CartLogDetails::QuantityChange {
            item_id,
            name,
            quantity,
            previous_quantity,
        } => format!(
            "{} x{} -> x{}",
            name.as_deref().unwrap_or(item_id),
            previous_quantity,
            quantity
        ),
        CartLogDetails::Checkout {
            item_count,
            total_value,
        } => format!("{} items, ${:.2}", item_count, total_value),
        CartLogDetails::Note(note) => note.clone().unwrap_or_default(),
        CartLogDetails::Raw(value) => value.to_string(),
    }
}

fn collection_name(collection: Collection) -> &'static str {
    match collection {
        Collection::Item => "item",
        Collection::Cart => "cart",
        Collection::Session => "session",
    }
}

fn not_found(collection: Collection, id: String) -> Error {
    Error::NotFound {
        collection: collection_name(collection),
        id,
    }
}

/// Fill a missing range with the `days` days ending today. A half-given
/// range is passed through so it is rejected downstream.
fn resolve_range(range: &RangeArgs, today: NaiveDate, days: u32) -> (Option<String>, Option<String>) {
    match (&range.from, &range.to) {
        (None, None) => {
            let default = DateRange::last_days(today, days);
            (
                Some(default.from_date().format("%Y-%m-%d").to_string()),
                Some(default.to_date().format("%Y-%m-%d").to_string()),
            )
        }
        _ => (range.from.clone(), range.to.clone()),
    }
}

/// Newest first, then filtered and truncated like the store query.
fn filter_logs(mut logs: Vec<CartLog>, filter: &CartLogFilter) -> Vec<CartLog> {
    logs.retain(|l| {
        filter.cart_id.as_ref().map_or(true, |c| &l.cart_id == c)
            && filter.action.map_or(true, |a| l.action == a)
    });
    logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    if let Some(limit) = filter.limit {
        logs.truncate(limit);
    }
    logs
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(value),
    }
    Ok(())
}

fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    if rows.is_empty() {
        println!("No data.");
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        println!("{}", padded.join("  ").trim_end());
    };

    line(headers.to_vec());
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in &rows {
        line(row.iter().map(String::as_str).collect());
    }
}
