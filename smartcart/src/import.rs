//! smartcart-import - load a JSON snapshot into the local store
//!
//! Reads a snapshot of items, carts, sessions and cart logs (the shape a
//! document store export or the seed data produces) and writes it in
//! batched transactions.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Store: $XDG_DATA_HOME/smartcart/store.db (~/.local/share/smartcart/store.db)
//! - Logs: $XDG_STATE_HOME/smartcart/smartcart.<date>.log
//! - Config: $XDG_CONFIG_HOME/smartcart/config.toml (~/.config/smartcart/config.toml)

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use smartcart_core::config::MAX_BATCH_SIZE;
use smartcart_core::{Config, Database, Snapshot};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "smartcart-import")]
#[command(about = "Import a JSON snapshot into the smartcart store")]
#[command(version)]
struct Args {
    /// Snapshot file with `items`, `carts`, `sessions` and `cartLogs` arrays
    snapshot: PathBuf,

    /// Records per transaction (default: from config)
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Parse and count records without writing
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        smartcart_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(snapshot = %args.snapshot.display(), "smartcart-import starting");

    let batch_size = args.batch_size.unwrap_or(config.store.batch_size);
    if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
        bail!("batch size must be between 1 and {}", MAX_BATCH_SIZE);
    }

    let text = std::fs::read_to_string(&args.snapshot)
        .with_context(|| format!("failed to read {}", args.snapshot.display()))?;
    let snapshot = Snapshot::from_json(&text).context("failed to parse snapshot")?;

    let total = snapshot.items.len()
        + snapshot.carts.len()
        + snapshot.sessions.len()
        + snapshot.cart_logs.len();

    println!(
        "Snapshot: {} items, {} carts, {} sessions, {} cart logs",
        snapshot.items.len(),
        snapshot.carts.len(),
        snapshot.sessions.len(),
        snapshot.cart_logs.len()
    );

    if args.dry_run {
        println!("Dry run: nothing written.");
        return Ok(());
    }

    let db_path = config.store_path();
    tracing::info!(path = %db_path.display(), "Opening store");
    let db = Database::open(&db_path).context("failed to open store")?;
    db.migrate().context("failed to run store migrations")?;

    println!("Store: {}", db_path.display());

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );
    pb.set_message("records");

    let summary = db
        .import_snapshot(snapshot, batch_size, |written| pb.inc(written as u64))
        .context("import failed")?;

    pb.finish_and_clear();

    println!("Import complete:");
    println!("  Items:      {}", summary.items);
    println!("  Carts:      {}", summary.carts);
    println!("  Sessions:   {}", summary.sessions);
    println!("  Cart logs:  {}", summary.cart_logs);
    println!("  Total:      {}", summary.total());
    println!("  Batches:    {}", summary.batches);

    Ok(())
}
