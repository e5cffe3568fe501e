use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::CACHE_TTL_SECS;

/// Timestamp format written to the `last_updated` column
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse variant: the trailing `%.f` also accepts rows written with
/// fractional seconds by older tooling
const LAST_UPDATED_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Wall-clock timestamp in the `last_updated` column format
pub fn current_timestamp() -> String {
    Utc::now().format(LAST_UPDATED_FORMAT).to_string()
}

/// A fully populated fundamentals record, ready to serve.
///
/// Field names match the JSON contract of the dashboard frontend, so this
/// struct doubles as the wire format for `/stocks` and `/update`. Numeric
/// fields use `0.0` for "provider had no value"; the frontend renders those
/// as dashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRecord {
    /// Ticker symbol with exchange suffix (e.g., "PKO.WA")
    pub ticker: String,

    /// Human-readable company name
    pub name: String,

    /// Last traded price in the listing currency
    pub price: f64,

    /// Trailing price-to-earnings ratio
    pub pe: f64,

    /// Price-to-book ratio
    pub pbv: f64,

    /// Return on equity, as a fraction (0.12 = 12%)
    pub roe: f64,

    /// Dividend yield, as a fraction (0.04 = 4%)
    pub div_yield: f64,

    /// Operating margin, as a fraction
    pub operating_margin: f64,

    /// EBITDA in the listing currency
    pub ebitda: f64,

    /// Total debt in the listing currency
    pub total_debt: f64,

    /// Total cash in the listing currency
    pub total_cash: f64,

    /// Analyst consensus label (e.g., "buy", "hold"), or "none"
    pub recommendation: String,

    /// Market capitalization in the listing currency
    pub market_cap: f64,

    /// Beta versus the reference index
    pub beta: f64,

    /// GICS-style sector label, or "Unknown"
    pub sector: String,

    /// Mean P/E across cached peers in the same sector
    pub sector_pe_avg: f64,

    /// Mean operating margin across cached peers in the same sector
    pub sector_margin_avg: f64,

    /// When this row was last fetched, `%Y-%m-%d %H:%M:%S` UTC
    pub last_updated: String,
}

/// A raw row from the `stocks` table.
///
/// Columns added by schema migrations are `Option`-typed because rows
/// written before a migration carry NULL there. [`CachedStock::into_complete`]
/// promotes a structurally complete row into a [`StockRecord`]; rows that
/// fail promotion are treated as cache misses and refetched.
#[derive(Debug, Clone)]
pub struct CachedStock {
    pub ticker: String,
    pub price: f64,
    pub pe: f64,
    pub pbv: f64,
    pub roe: f64,
    pub div_yield: f64,
    pub last_updated: String,
    pub name: Option<String>,
    pub recommendation: Option<String>,
    pub market_cap: Option<f64>,
    pub beta: Option<f64>,
    pub sector: Option<String>,
    pub operating_margin: Option<f64>,
    pub ebitda: Option<f64>,
    pub total_debt: Option<f64>,
    pub total_cash: Option<f64>,
}

/// A text column counts as populated only if it is non-NULL, non-empty and
/// not the literal string "None" (a historical artifact of rows written by
/// earlier tooling that stringified missing values).
fn text_present(value: &Option<String>) -> bool {
    match value {
        Some(s) => !s.is_empty() && s != "None",
        None => false,
    }
}

impl CachedStock {
    /// Parse the `last_updated` column. Unparseable rows are treated as
    /// infinitely old.
    pub fn last_updated_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.last_updated, LAST_UPDATED_PARSE_FORMAT).ok()
    }

    /// TTL check: has this row been refreshed within the cache window?
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.last_updated_at() {
            Some(t) => (now.naive_utc() - t).num_seconds() <= CACHE_TTL_SECS,
            None => false,
        }
    }

    /// Structural completeness: every field the dashboard needs is populated.
    /// Descriptive fields must pass [`text_present`]; `market_cap`,
    /// `operating_margin` and `ebitda` must be non-NULL. `beta`, `total_debt`
    /// and `total_cash` are nice-to-have and default to zero.
    pub fn is_complete(&self) -> bool {
        text_present(&self.name)
            && text_present(&self.sector)
            && text_present(&self.recommendation)
            && self.market_cap.is_some()
            && self.operating_margin.is_some()
            && self.ebitda.is_some()
    }

    /// A row is servable from cache only if it is both structurally complete
    /// and within the TTL window.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_complete() && self.is_fresh(now)
    }

    /// Promote a structurally complete row into a servable record. Sector
    /// averages start at zero and are attached later from the full result
    /// set.
    pub fn into_complete(self) -> Option<StockRecord> {
        if !self.is_complete() {
            return None;
        }
        Some(StockRecord {
            ticker: self.ticker,
            name: self.name.unwrap_or_default(),
            price: self.price,
            pe: self.pe,
            pbv: self.pbv,
            roe: self.roe,
            div_yield: self.div_yield,
            operating_margin: self.operating_margin.unwrap_or(0.0),
            ebitda: self.ebitda.unwrap_or(0.0),
            total_debt: self.total_debt.unwrap_or(0.0),
            total_cash: self.total_cash.unwrap_or(0.0),
            recommendation: self.recommendation.unwrap_or_default(),
            market_cap: self.market_cap.unwrap_or(0.0),
            beta: self.beta.unwrap_or(0.0),
            sector: self.sector.unwrap_or_default(),
            sector_pe_avg: 0.0,
            sector_margin_avg: 0.0,
            last_updated: self.last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn cached(ticker: &str) -> CachedStock {
        CachedStock {
            ticker: ticker.to_string(),
            price: 100.0,
            pe: 12.0,
            pbv: 1.5,
            roe: 0.11,
            div_yield: 0.04,
            last_updated: "2026-08-25 10:00:00".to_string(),
            name: Some("PKO BP".to_string()),
            recommendation: Some("buy".to_string()),
            market_cap: Some(5.0e10),
            beta: Some(1.1),
            sector: Some("Financial Services".to_string()),
            operating_margin: Some(0.35),
            ebitda: Some(1.0e9),
            total_debt: Some(2.0e9),
            total_cash: Some(3.0e9),
        }
    }

    #[test]
    fn test_complete_row_promotes() {
        let record = cached("PKO.WA").into_complete().unwrap();
        assert_eq!(record.ticker, "PKO.WA");
        assert_eq!(record.name, "PKO BP");
        assert_eq!(record.sector_pe_avg, 0.0);
        assert_eq!(record.sector_margin_avg, 0.0);
    }

    #[test]
    fn test_missing_name_blocks_promotion() {
        let mut row = cached("PKO.WA");
        row.name = None;
        assert!(row.into_complete().is_none());
    }

    #[test]
    fn test_literal_none_string_blocks_promotion() {
        let mut row = cached("PKO.WA");
        row.recommendation = Some("None".to_string());
        assert!(!row.is_complete());

        let mut row = cached("PKO.WA");
        row.sector = Some(String::new());
        assert!(!row.is_complete());
    }

    #[test]
    fn test_null_margin_or_ebitda_blocks_promotion() {
        let mut row = cached("KGH.WA");
        row.operating_margin = None;
        assert!(!row.is_complete());

        let mut row = cached("KGH.WA");
        row.ebitda = None;
        assert!(!row.is_complete());

        let mut row = cached("KGH.WA");
        row.market_cap = None;
        assert!(!row.is_complete());
    }

    #[test]
    fn test_optional_extras_default_to_zero() {
        let mut row = cached("LPP.WA");
        row.beta = None;
        row.total_debt = None;
        row.total_cash = None;
        assert!(row.is_complete());
        let record = row.into_complete().unwrap();
        assert_eq!(record.beta, 0.0);
        assert_eq!(record.total_debt, 0.0);
        assert_eq!(record.total_cash, 0.0);
    }

    #[test]
    fn test_freshness_window() {
        let row = cached("PZU.WA");
        let written = Utc.with_ymd_and_hms(2026, 8, 25, 10, 0, 0).unwrap();

        assert!(row.is_fresh(written + Duration::minutes(59)));
        assert!(!row.is_fresh(written + Duration::minutes(61)));
    }

    #[test]
    fn test_expired_sentinel_is_stale() {
        let mut row = cached("PZU.WA");
        row.last_updated = "2000-01-01 00:00:00".to_string();
        assert!(!row.is_fresh(Utc::now()));
    }

    #[test]
    fn test_unparseable_timestamp_is_stale() {
        let mut row = cached("PZU.WA");
        row.last_updated = "not a date".to_string();
        assert!(row.last_updated_at().is_none());
        assert!(!row.is_fresh(Utc::now()));
    }

    #[test]
    fn test_fractional_seconds_parse() {
        let mut row = cached("PZU.WA");
        row.last_updated = "2026-08-25 10:00:00.123456".to_string();
        assert!(row.last_updated_at().is_some());
    }

    #[test]
    fn test_current_timestamp_round_trips() {
        let mut row = cached("PZU.WA");
        row.last_updated = current_timestamp();
        assert!(row.last_updated_at().is_some());
        assert!(row.is_fresh(Utc::now()));
    }
}
