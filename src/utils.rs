use std::path::PathBuf;

use crate::constants::{DEFAULT_DB_PATH, DEFAULT_FETCH_CONCURRENCY};

/// Get SQLite database path from environment variable or use default
pub fn get_database_path() -> PathBuf {
    std::env::var("GPWATCH_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH))
}

/// Get the provider fan-out width from environment variable or use default.
/// Zero or unparseable values fall back to the default.
pub fn get_fetch_concurrency() -> usize {
    std::env::var("GPWATCH_FETCH_CONCURRENCY")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_FETCH_CONCURRENCY)
}

/// Get the universe CSV path from environment variable, if configured
pub fn get_universe_file() -> Option<PathBuf> {
    std::env::var("GPWATCH_UNIVERSE").map(PathBuf::from).ok()
}

/// Round to two decimal places, the precision everything leaves the API with
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
