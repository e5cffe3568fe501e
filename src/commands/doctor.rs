use chrono::Utc;

use crate::models::Universe;
use crate::services::StockStore;
use crate::utils::{get_database_path, get_fetch_concurrency, get_universe_file};

pub async fn run() {
    println!("🔍 Running gpwatch health check...\n");

    let mut issues: Vec<String> = Vec::new();

    // Configuration
    let database_path = get_database_path();
    println!("💾 Database path:     {}", database_path.display());
    println!("⚡ Fetch concurrency: {}", get_fetch_concurrency());
    match get_universe_file() {
        Some(path) => println!("📋 Universe file:     {}", path.display()),
        None => println!("📋 Universe file:     (built-in WIG20)"),
    }

    // Universe
    match Universe::load() {
        Ok(universe) => {
            println!("📈 Universe:          {} tickers", universe.len());
        }
        Err(e) => {
            println!("❌ Universe:          failed to load");
            issues.push(format!("Universe failed to load: {}", e));
        }
    }
    println!();

    // Database
    if !database_path.exists() {
        println!("⚠️  Database not created yet. The first refresh will create it.");
    } else {
        check_database(database_path, &mut issues).await;
    }

    println!();
    println!("📊 Health Check Summary");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if issues.is_empty() {
        println!("✅ Everything looks healthy.");
        return;
    }

    println!("⚠️  {} issues found:\n", issues.len());
    for issue in &issues {
        println!("   ⚠️  {}", issue);
    }
    std::process::exit(1);
}

async fn check_database(database_path: std::path::PathBuf, issues: &mut Vec<String>) {
    let store = match StockStore::new(database_path).await {
        Ok(store) => store,
        Err(e) => {
            println!("❌ Database failed to open");
            issues.push(format!("Database failed to open: {}", e));
            return;
        }
    };

    match store.all().await {
        Ok(rows) => {
            let now = Utc::now();
            let fresh = rows.iter().filter(|r| r.is_usable(now)).count();
            println!(
                "✅ Database opens: {} rows cached, {} fresh",
                rows.len(),
                fresh
            );

            for row in &rows {
                if !row.is_complete() {
                    issues.push(format!(
                        "{} is missing fundamentals fields and will be refetched",
                        row.ticker
                    ));
                }
                if row.last_updated_at().is_none() {
                    issues.push(format!(
                        "{} has an unparseable last_updated value: {:?}",
                        row.ticker, row.last_updated
                    ));
                }
            }
        }
        Err(e) => {
            issues.push(format!("Table scan failed: {}", e));
        }
    }

    store.close().await;
}
