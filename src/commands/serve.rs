use std::sync::Arc;

use crate::models::Universe;
use crate::provider::{MarketDataProvider, YahooClient};
use crate::server;
use crate::services::{ForecastService, HistoryService, Refresher, StockStore};
use crate::utils::{get_database_path, get_fetch_concurrency};

pub async fn run(port: u16) {
    println!("🚀 Starting gpwatch server on port {}", port);

    let database_path = get_database_path();
    println!("💾 Cache database: {}", database_path.display());

    let store = match StockStore::new(database_path).await {
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
    println!("📈 Tracking {} tickers", universe.len());

    let concurrency = get_fetch_concurrency();
    println!("⚡ Fetch concurrency: {}", concurrency);

    let provider: Arc<dyn MarketDataProvider> = match YahooClient::new() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("❌ Failed to build the provider client: {}", e);
            std::process::exit(1);
        }
    };

    let refresher = Arc::new(Refresher::new(
        store,
        Arc::clone(&provider),
        universe,
        concurrency,
    ));
    let history = HistoryService::new(provider);
    let forecast = ForecastService::new(history.clone());

    if let Err(e) = server::serve(refresher, history, forecast, port).await {
        eprintln!("❌ Server error: {}", e);
        std::process::exit(1);
    }
}
