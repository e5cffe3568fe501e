use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::seq::SliceRandom;
use serde_json::Value;
use std::time::Duration as StdDuration;
use tokio::time::sleep;

use super::{FinancialStatements, FundamentalsSnapshot, MarketDataProvider, PricePoint};
use crate::error::{AppError, Result};
use crate::models::Interval;

const MAX_RETRIES: u32 = 5;

/// quoteSummary modules covering quote, ratios, profile and analyst data
const QUOTE_SUMMARY_MODULES: &str =
    "price,summaryDetail,financialData,defaultKeyStatistics,assetProfile";

/// Annual statement series consumed by the ROE fallback
const TIMESERIES_TYPES: &str = "annualNetIncome,annualStockholdersEquity";

/// Yahoo Finance public JSON API client.
///
/// Yahoo serves these endpoints to browsers, so requests carry a rotating
/// browser user agent. Transient failures (timeouts, 429, 5xx) are retried
/// with exponential backoff and jitter; other client errors fail fast.
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
    user_agents: Vec<String>,
}

impl YahooClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(30))
            .build()?;

        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0".to_string(),
        ];

        Ok(Self {
            client,
            base_url: "https://query1.finance.yahoo.com".to_string(),
            user_agents,
        })
    }

    fn user_agent(&self) -> String {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .unwrap_or(&self.user_agents[0])
            .clone()
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let mut last_error: Option<String> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = StdDuration::from_secs_f64(
                    2.0_f64.powi(attempt as i32 - 1) + rand::random::<f64>(),
                );
                let delay = delay.min(StdDuration::from_secs(30));
                let reason = last_error.as_deref().unwrap_or("unknown error");
                tracing::info!(
                    "Provider retry backoff: attempt {}/{} - reason: {}, waiting {:.1}s",
                    attempt + 1,
                    MAX_RETRIES,
                    reason,
                    delay.as_secs_f64()
                );
                sleep(delay).await;
            }

            tracing::debug!("Provider request: url={}, attempt={}", url, attempt + 1);

            let response = self
                .client
                .get(url)
                .header(reqwest::header::USER_AGENT, self.user_agent())
                .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        match resp.json::<Value>().await {
                            Ok(data) => return Ok(data),
                            Err(e) => {
                                last_error = Some(format!("JSON parse error: {}", e));
                                continue;
                            }
                        }
                    } else if status.as_u16() == 429 {
                        last_error = Some("Too Many Requests (429) - rate limited".to_string());
                        continue;
                    } else if status.is_server_error() {
                        last_error = Some(format!("Server error ({})", status.as_u16()));
                        continue;
                    } else {
                        // Remaining 4xx are request problems, retrying cannot fix them
                        return Err(AppError::Provider(format!(
                            "Client error ({}) for {}",
                            status.as_u16(),
                            url
                        )));
                    }
                }
                Err(e) => {
                    last_error = Some(format!("Network error: {}", e));
                    continue;
                }
            }
        }

        Err(AppError::Network(format!(
            "Max retries exceeded for {}: {}",
            url,
            last_error.unwrap_or_else(|| "unknown error".to_string())
        )))
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn fetch_snapshot(&self, ticker: &str) -> Result<FundamentalsSnapshot> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules={}",
            self.base_url, ticker, QUOTE_SUMMARY_MODULES
        );
        let data = self.get_json(&url).await?;
        parse_snapshot(ticker, &data)
    }

    async fn fetch_financials(&self, ticker: &str) -> Result<FinancialStatements> {
        let period2 = Utc::now();
        let period1 = period2 - ChronoDuration::days(5 * 365);
        let url = format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{}?symbol={}&type={}&period1={}&period2={}",
            self.base_url,
            ticker,
            ticker,
            TIMESERIES_TYPES,
            period1.timestamp(),
            period2.timestamp()
        );
        let data = self.get_json(&url).await?;
        Ok(parse_financials(&data))
    }

    async fn fetch_history(
        &self,
        ticker: &str,
        period: &str,
        interval: Interval,
    ) -> Result<Vec<PricePoint>> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval={}",
            self.base_url,
            ticker,
            period,
            interval.as_str()
        );
        let data = self.get_json(&url).await?;
        parse_chart(ticker, &data)
    }
}

/// Yahoo wraps most numbers as `{"raw": 12.3, "fmt": "12.30"}`; a few arrive
/// as plain numbers. Accept both.
fn raw_num(section: &Value, key: &str) -> Option<f64> {
    let field = section.get(key)?;
    field
        .get("raw")
        .and_then(Value::as_f64)
        .or_else(|| field.as_f64())
}

fn text_field(section: &Value, key: &str) -> Option<String> {
    section
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

fn parse_snapshot(ticker: &str, data: &Value) -> Result<FundamentalsSnapshot> {
    let result = match data["quoteSummary"]["result"].get(0) {
        Some(r) => r,
        None => {
            return Err(AppError::Provider(format!(
                "quoteSummary carried no result for {}",
                ticker
            )))
        }
    };

    let price = &result["price"];
    let summary = &result["summaryDetail"];
    let financial = &result["financialData"];
    let key_stats = &result["defaultKeyStatistics"];
    let profile = &result["assetProfile"];

    Ok(FundamentalsSnapshot {
        name: text_field(price, "longName").or_else(|| text_field(price, "shortName")),
        current_price: raw_num(financial, "currentPrice"),
        regular_market_price: raw_num(price, "regularMarketPrice"),
        previous_close: raw_num(summary, "previousClose"),
        trailing_pe: raw_num(summary, "trailingPE"),
        price_to_book: raw_num(key_stats, "priceToBook"),
        return_on_equity: raw_num(financial, "returnOnEquity"),
        dividend_yield: raw_num(summary, "dividendYield"),
        recommendation: text_field(financial, "recommendationKey"),
        market_cap: raw_num(price, "marketCap").or_else(|| raw_num(summary, "marketCap")),
        beta: raw_num(summary, "beta").or_else(|| raw_num(key_stats, "beta")),
        sector: text_field(profile, "sector"),
        operating_margin: raw_num(financial, "operatingMargins"),
        ebitda: raw_num(financial, "ebitda"),
        total_debt: raw_num(financial, "totalDebt"),
        total_cash: raw_num(financial, "totalCash"),
    })
}

/// Collect one timeseries into (asOfDate, value) pairs, most recent first.
/// Periods without a reported value come through as null entries and are
/// skipped.
fn collect_series(item: &Value, series_type: &str) -> Vec<f64> {
    let entries = match item.get(series_type).and_then(Value::as_array) {
        Some(e) => e,
        None => return Vec::new(),
    };

    let mut dated: Vec<(String, f64)> = entries
        .iter()
        .filter_map(|entry| {
            let as_of = entry.get("asOfDate")?.as_str()?.to_string();
            let value = entry.get("reportedValue")?.get("raw")?.as_f64()?;
            Some((as_of, value))
        })
        .collect();

    dated.sort_by(|a, b| b.0.cmp(&a.0));
    dated.into_iter().map(|(_, v)| v).collect()
}

fn parse_financials(data: &Value) -> FinancialStatements {
    let mut statements = FinancialStatements::default();

    let results = match data["timeseries"]["result"].as_array() {
        Some(r) => r,
        None => return statements,
    };

    for item in results {
        let series_type = match item["meta"]["type"].get(0).and_then(Value::as_str) {
            Some(t) => t,
            None => continue,
        };

        let values = collect_series(item, series_type);
        if values.is_empty() {
            continue;
        }

        match series_type {
            "annualNetIncome" => {
                statements.income.insert("Net Income".to_string(), values);
            }
            "annualStockholdersEquity" => {
                statements
                    .balance
                    .insert("Stockholders Equity".to_string(), values);
            }
            _ => {}
        }
    }

    statements
}

fn parse_chart(ticker: &str, data: &Value) -> Result<Vec<PricePoint>> {
    let result = match data["chart"]["result"].get(0) {
        Some(r) => r,
        None => {
            return Err(AppError::Provider(format!(
                "chart carried no result for {}",
                ticker
            )))
        }
    };

    // A result with no candles (delisted ticker, market holiday window) has
    // no timestamp array at all.
    let timestamps = match result.get("timestamp").and_then(Value::as_array) {
        Some(t) => t,
        None => return Ok(Vec::new()),
    };

    let closes = match result["indicators"]["quote"]
        .get(0)
        .and_then(|q| q.get("close"))
        .and_then(Value::as_array)
    {
        Some(c) => c,
        None => return Ok(Vec::new()),
    };

    if closes.len() != timestamps.len() {
        return Err(AppError::Provider(format!(
            "chart arrays have inconsistent lengths for {}",
            ticker
        )));
    }

    let mut points = Vec::new();
    for (ts, close) in timestamps.iter().zip(closes) {
        let ts = match ts.as_i64() {
            Some(t) => t,
            None => continue,
        };
        // Null closes mark candles the exchange never printed
        let close = match close.as_f64() {
            Some(c) => c,
            None => continue,
        };
        let time = match DateTime::<Utc>::from_timestamp(ts, 0) {
            Some(t) => t,
            None => continue,
        };
        points.push(PricePoint { time, close });
    }

    points.sort_by(|a, b| a.time.cmp(&b.time));
    Ok(points)
}
