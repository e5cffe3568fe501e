use chrono::Utc;

use crate::error::Result;
use crate::models::CachedStock;
use crate::services::StockStore;
use crate::utils::get_database_path;

pub async fn run() {
    println!("📊 Cache Status\n");

    match show_status().await {
        Ok(()) => {}
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn show_status() -> Result<()> {
    let database_path = get_database_path();
    if !database_path.exists() {
        println!("⚠️  No cache database at {} yet.", database_path.display());
        println!("   Run 'refresh' or hit GET /stocks to create it.");
        return Ok(());
    }

    let store = StockStore::new(database_path).await?;
    let rows = store.all().await?;

    if rows.is_empty() {
        println!("⚠️  Cache is empty. Run 'refresh' or hit GET /stocks first.");
        store.close().await;
        return Ok(());
    }

    let now = Utc::now();
    let fresh = rows.iter().filter(|r| r.is_usable(now)).count();

    println!("📈 Cached tickers: {}", rows.len());
    println!("✅ Fresh:          {}", fresh);
    println!("⏳ Stale:          {}\n", rows.len() - fresh);

    println!("═══════════════════════════════════════════════════════════\n");
    for row in &rows {
        show_row(row, now);
    }
    println!("\n═══════════════════════════════════════════════════════════");
    println!("💡 Tip: stale rows are refetched automatically on the next read");

    store.close().await;
    Ok(())
}

fn show_row(row: &CachedStock, now: chrono::DateTime<Utc>) {
    let marker = if row.is_usable(now) { "✅" } else { "⏳" };
    let name = row.name.as_deref().unwrap_or("-");
    println!(
        "   {} {:<8} {:<24} {:>10.2} PLN   updated {}",
        marker, row.ticker, name, row.price, row.last_updated
    );
}
