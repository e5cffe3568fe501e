use std::sync::Arc;

use crate::models::Universe;
use crate::provider::{MarketDataProvider, YahooClient};
use crate::services::{Refresher, StockStore};
use crate::utils::{get_database_path, get_fetch_concurrency};

pub async fn run() {
    println!("🚀 Refreshing GPW fundamentals...\n");

    let store = match StockStore::new(get_database_path()).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("❌ Failed to initialize the cache database: {}", e);
            std::process::exit(1);
        }
    };

    let universe = match Universe::load() {
        Ok(universe) => universe,
        Err(e) => {
            eprintln!("❌ Failed to load the ticker universe: {}", e);
            std::process::exit(1);
        }
    };

    let provider: Arc<dyn MarketDataProvider> = match YahooClient::new() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("❌ Failed to build the provider client: {}", e);
            std::process::exit(1);
        }
    };

    let expected = universe.len();
    let refresher = Refresher::new(
        Arc::clone(&store),
        provider,
        universe,
        get_fetch_concurrency(),
    );

    match refresher.get_all_stocks().await {
        Ok(stocks) => {
            println!("✅ {} of {} stocks ready:\n", stocks.len(), expected);
            for stock in &stocks {
                println!(
                    "   {:<8} {:<24} {:>10.2} PLN   P/E {:>6.1}   {}",
                    stock.ticker, stock.name, stock.price, stock.pe, stock.sector
                );
            }
            if stocks.len() < expected {
                println!(
                    "\n⚠️  {} tickers could not be fetched this cycle.",
                    expected - stocks.len()
                );
            }
        }
        Err(e) => {
            eprintln!("❌ Refresh failed: {}", e);
            std::process::exit(1);
        }
    }

    store.close().await;
}
