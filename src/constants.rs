//! Shared Constants
//!
//! Defaults for the stock universe, cache freshness, forecasting and the
//! server itself. Most of these can be overridden at runtime through the
//! `GPWATCH_*` environment variables (see `utils.rs`).

/// Default stock universe: the WIG20 constituents on Yahoo Finance
/// (Warsaw-listed tickers carry the `.WA` suffix).
pub const WIG20_TICKERS: &[&str] = &[
    "ALE.WA", "ALR.WA", "BDX.WA", "CDR.WA", "CPS.WA", "DNP.WA", "JSW.WA",
    "KGH.WA", "KRU.WA", "KTY.WA", "LPP.WA", "MBK.WA", "OPL.WA", "PEO.WA",
    "PGE.WA", "ORL.WA", "PKO.WA", "PZU.WA", "SPL.WA", "PCO.WA",
];

/// Display-name overrides for tickers whose provider long name is missing,
/// unwieldy or plain wrong. Tickers not listed here fall back to the
/// provider name, then to the ticker with its exchange suffix stripped.
pub const TICKER_NAME_OVERRIDES: &[(&str, &str)] = &[
    ("ALE.WA", "Allegro"),
    ("ALR.WA", "Alior Bank"),
    ("BDX.WA", "Budimex"),
    ("CDR.WA", "CD Projekt"),
    ("CPS.WA", "Cyfrowy Polsat"),
    ("DNP.WA", "Dino Polska"),
    ("JSW.WA", "JSW"),
    ("KGH.WA", "KGHM"),
    ("KRU.WA", "Kruk"),
    ("KTY.WA", "Grupa Kęty"),
    ("LPP.WA", "LPP"),
    ("MBK.WA", "mBank"),
    ("OPL.WA", "Orange Polska"),
    ("PEO.WA", "Bank Pekao"),
    ("PGE.WA", "PGE"),
    ("ORL.WA", "Orlen"),
    ("PKO.WA", "PKO BP"),
    ("PZU.WA", "PZU"),
    ("SPL.WA", "Santander"),
    ("PCO.WA", "Pepco"),
];

/// Cached fundamentals older than this are refetched on the next read.
pub const CACHE_TTL_SECS: i64 = 3600;

/// Minimum number of closing prices required to fit a trend line.
/// Below this the forecast endpoint reports no prediction.
pub const MIN_FORECAST_POINTS: usize = 10;

/// Default forecast horizon in trading days.
pub const DEFAULT_FORECAST_DAYS: usize = 7;

/// History window the forecaster trains on.
pub const FORECAST_TRAINING_PERIOD: &str = "6mo";

/// Trend band: projected moves within +/- this percentage are "neutral".
pub const TREND_NEUTRAL_BAND_PCT: f64 = 0.5;

/// Default number of tickers fetched from the provider at the same time.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default SQLite database file, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "gpw_data.db";

/// Sector label used when the provider does not classify a ticker.
pub const UNKNOWN_SECTOR: &str = "Unknown";

/// Recommendation label used when the provider has no analyst consensus.
pub const NO_RECOMMENDATION: &str = "none";
