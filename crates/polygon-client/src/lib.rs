use analysis_core::{
    info_keys, AnalysisError, Bar, InfoValue, MarketData, MarketDataSource, Period, TickerInfo,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub mod error;

pub use error::PolygonError;

const DEFAULT_BASE_URL: &str = "https://api.polygon.io";
const MAX_ATTEMPTS: u32 = 3;
const RATE_LIMIT_BACKOFF_SECS: u64 = 15;

#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl PolygonClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        }
    }

    /// Build from `POLYGON_API_KEY` and the optional `POLYGON_BASE_URL`.
    pub fn from_env() -> Result<Self, PolygonError> {
        let api_key = std::env::var("POLYGON_API_KEY")
            .map_err(|_| PolygonError::MissingConfig("POLYGON_API_KEY".to_string()))?;
        let mut client = Self::new(api_key);
        if let Ok(base_url) = std::env::var("POLYGON_BASE_URL") {
            client = client.with_base_url(base_url);
        }
        Ok(client)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send a request, retrying on HTTP 429.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, PolygonError> {
        let request = builder.query(&[("apiKey", &self.api_key)]).build()?;

        for attempt in 1..=MAX_ATTEMPTS {
            let Some(req) = request.try_clone() else {
                break;
            };
            let response = self.client.execute(req).await?;

            if response.status().as_u16() != 429 {
                if !response.status().is_success() {
                    return Err(PolygonError::Status {
                        status: response.status().as_u16(),
                        body: response.text().await.unwrap_or_default(),
                    });
                }
                return Ok(response);
            }

            if attempt < MAX_ATTEMPTS {
                tracing::warn!(
                    "Polygon 429 rate limited, waiting {}s before retry {}/{}",
                    RATE_LIMIT_BACKOFF_SECS,
                    attempt,
                    MAX_ATTEMPTS - 1
                );
                tokio::time::sleep(Duration::from_secs(RATE_LIMIT_BACKOFF_SECS)).await;
            }
        }

        Err(PolygonError::RateLimited(MAX_ATTEMPTS))
    }

    /// Daily bars between `from` and `to` (inclusive), oldest first
    pub async fn get_daily_bars(&self, symbol: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Bar>, PolygonError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}",
            self.base_url,
            symbol,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let response = self
            .send_request(self.client.get(&url).query(&[
                ("adjusted", "true"),
                ("sort", "asc"),
                ("limit", "50000"),
            ]))
            .await?;

        let aggregates: AggregateResponse = response.json().await?;
        Ok(aggregates_to_bars(aggregates.results))
    }

    /// Reference data for a ticker
    pub async fn get_ticker_details(&self, symbol: &str) -> Result<TickerDetails, PolygonError> {
        let url = format!("{}/v3/reference/tickers/{}", self.base_url, symbol);
        let response = self.send_request(self.client.get(&url)).await?;
        let details: TickerDetailsResponse = response.json().await?;
        Ok(details.results)
    }
}

#[async_trait]
impl MarketDataSource for PolygonClient {
    async fn fetch(&self, ticker: &str, period: Period) -> Result<MarketData, AnalysisError> {
        let (from, to) = date_range(period, Utc::now().date_naive());

        let (bars, details) = tokio::join!(
            self.get_daily_bars(ticker, from, to),
            self.get_ticker_details(ticker),
        );

        let bars = bars?;
        let info = match details {
            Ok(details) => details_to_info(details),
            Err(e) => {
                tracing::warn!("Ticker details unavailable for {}: {}", ticker, e);
                TickerInfo::new()
            }
        };

        tracing::info!("Fetched {} daily bars for {} ({} to {})", bars.len(), ticker, from, to);
        Ok(MarketData { bars, info })
    }
}

/// Inclusive date range covering `period` and ending on `today`
pub fn date_range(period: Period, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - ChronoDuration::days(period.calendar_days()), today)
}

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp (ms)
    o: f64, // open
    h: f64, // high
    l: f64, // low
    c: f64, // close
    v: f64, // volume
}

/// Convert aggregates into bars ordered by date, one bar per date (last wins).
fn aggregates_to_bars(results: Vec<AggregateResult>) -> Vec<Bar> {
    let mut bars: Vec<Bar> = results
        .into_iter()
        .filter_map(|r| {
            let Some(ts) = DateTime::from_timestamp_millis(r.t) else {
                tracing::warn!("Dropping aggregate with invalid timestamp {}", r.t);
                return None;
            };
            Some(Bar {
                date: ts.date_naive(),
                open: r.o,
                high: r.h,
                low: r.l,
                close: r.c,
                volume: r.v.max(0.0).round() as u64,
            })
        })
        .collect();

    bars.sort_by_key(|b| b.date);
    // dedup_by keeps the first of a run; swap in the later bar so the latest one wins
    bars.dedup_by(|later, earlier| {
        if later.date == earlier.date {
            std::mem::swap(later, earlier);
            true
        } else {
            false
        }
    });
    bars
}

#[derive(Debug, Deserialize)]
struct TickerDetailsResponse {
    results: TickerDetails,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerDetails {
    pub ticker: String,
    pub name: Option<String>,
    pub market_cap: Option<f64>,
    pub description: Option<String>,
    pub sic_description: Option<String>,
    pub total_employees: Option<i64>,
}

/// Map Polygon reference data onto the shared info keys. Missing fields stay absent.
fn details_to_info(details: TickerDetails) -> TickerInfo {
    TickerInfo::new()
        .with(info_keys::LONG_NAME, details.name.map(InfoValue::Text))
        .with(info_keys::MARKET_CAP, details.market_cap.map(InfoValue::Float))
        .with(info_keys::SECTOR, details.sic_description.map(InfoValue::Text))
        .with(info_keys::BUSINESS_SUMMARY, details.description.map(InfoValue::Text))
        .with(info_keys::TOTAL_EMPLOYEES, details.total_employees.map(InfoValue::Int))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-02 05:00 UTC (midnight New York) and the following two days
    const DAY1: i64 = 1_704_171_600_000;
    const DAY: i64 = 86_400_000;

    #[test]
    fn test_aggregates_to_bars_sorted_and_deduped() {
        let response: AggregateResponse = serde_json::from_str(&format!(
            r#"{{"results":[
                {{"t":{},"o":11,"h":12,"l":10,"c":11.5,"v":2000.4}},
                {{"t":{},"o":10,"h":11,"l":9,"c":10.5,"v":1000}},
                {{"t":{},"o":12,"h":13,"l":11,"c":12.5,"v":3000}},
                {{"t":{},"o":12,"h":14,"l":11,"c":13.5,"v":3500}}
            ]}}"#,
            DAY1 + DAY,
            DAY1,
            DAY1 + 2 * DAY,
            DAY1 + 2 * DAY
        ))
        .unwrap();

        let bars = aggregates_to_bars(response.results);

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].volume, 2000);
        assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
        // Duplicate date keeps the later aggregate
        assert_eq!(bars[2].close, 13.5);
    }

    #[test]
    fn test_missing_results_is_empty() {
        let response: AggregateResponse = serde_json::from_str(r#"{"status":"OK","resultsCount":0}"#).unwrap();
        assert!(aggregates_to_bars(response.results).is_empty());
    }

    #[test]
    fn test_details_to_info_skips_absent_fields() {
        let response: TickerDetailsResponse = serde_json::from_str(
            r#"{"results":{"ticker":"ACME","name":"Acme Corp","market_cap":1.5e9}}"#,
        )
        .unwrap();

        let info = details_to_info(response.results);

        assert_eq!(info.get_str(info_keys::LONG_NAME), Some("Acme Corp"));
        assert_eq!(info.get_f64(info_keys::MARKET_CAP), Some(1.5e9));
        assert!(info.get(info_keys::SECTOR).is_none());
        assert!(info.get(info_keys::TOTAL_EMPLOYEES).is_none());
        assert_eq!(info.len(), 2);
    }

    #[test]
    fn test_date_range() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let (from, to) = date_range(Period::OneYear, today);

        assert_eq!(to, today);
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = PolygonClient::new("key".to_string()).with_base_url("http://localhost:9000/");
        assert_eq!(client.base_url, "http://localhost:9000");
    }
}
