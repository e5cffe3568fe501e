use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::constants::{TICKER_NAME_OVERRIDES, WIG20_TICKERS};
use crate::error::{AppError, Result};

/// One tracked instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseEntry {
    /// Ticker symbol with exchange suffix
    pub ticker: String,

    /// Optional display-name override; when absent the provider name is used
    #[serde(default)]
    pub name: Option<String>,
}

/// The ordered set of tickers this instance tracks and refreshes.
///
/// Defaults to the WIG20 constituents. A CSV file with `ticker,name` columns
/// (name optional) can replace it, see [`Universe::load`].
#[derive(Debug, Clone)]
pub struct Universe {
    entries: Vec<UniverseEntry>,
}

impl Universe {
    /// The built-in WIG20 universe with its display-name overrides
    pub fn wig20() -> Self {
        let entries = WIG20_TICKERS
            .iter()
            .map(|ticker| UniverseEntry {
                ticker: ticker.to_string(),
                name: TICKER_NAME_OVERRIDES
                    .iter()
                    .find(|(t, _)| t == ticker)
                    .map(|(_, name)| name.to_string()),
            })
            .collect();
        Self { entries }
    }

    /// Load a universe from a CSV file with a `ticker` column and an
    /// optional `name` column. Duplicate tickers keep their first position.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path.as_ref())?;

        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        for result in reader.deserialize() {
            let mut entry: UniverseEntry = result?;
            if entry.ticker.trim().is_empty() {
                continue;
            }
            entry.ticker = entry.ticker.trim().to_string();
            entry.name = entry.name.filter(|n| !n.trim().is_empty());
            if seen.insert(entry.ticker.clone()) {
                entries.push(entry);
            }
        }

        if entries.is_empty() {
            return Err(AppError::Config(format!(
                "Universe file {} contains no tickers",
                path.as_ref().display()
            )));
        }
        Ok(Self { entries })
    }

    /// Build a universe from explicit entries
    pub fn from_entries(entries: Vec<UniverseEntry>) -> Self {
        Self { entries }
    }

    /// Resolve the universe for this process: the file named by
    /// `GPWATCH_UNIVERSE` if set, the built-in WIG20 list otherwise.
    pub fn load() -> Result<Self> {
        match crate::utils::get_universe_file() {
            Some(path) => Self::from_csv(path),
            None => Ok(Self::wig20()),
        }
    }

    /// Tickers in configured order
    pub fn tickers(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.ticker.clone()).collect()
    }

    /// Display-name override for a ticker, if configured
    pub fn name_override(&self, ticker: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.ticker == ticker)
            .and_then(|e| e.name.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
