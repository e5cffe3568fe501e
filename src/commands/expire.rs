use crate::services::StockStore;
use crate::utils::get_database_path;

pub async fn run() {
    println!("🧹 Expiring cached fundamentals...");

    let database_path = get_database_path();
    if !database_path.exists() {
        println!("⚠️  No cache database at {} yet, nothing to expire.", database_path.display());
        return;
    }

    let store = match StockStore::new(database_path).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("❌ Failed to open the cache database: {}", e);
            std::process::exit(1);
        }
    };

    match store.expire_all().await {
        Ok(count) => {
            println!("✅ Marked {} rows stale. The next read refetches everything.", count);
        }
        Err(e) => {
            eprintln!("❌ Failed to expire the cache: {}", e);
            std::process::exit(1);
        }
    }

    store.close().await;
}
