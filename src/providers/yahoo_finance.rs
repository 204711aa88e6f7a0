use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::config::YahooProviderConfig;
use crate::core::month::Month;
use crate::core::quote::{QuotePoint, QuoteSeries, QuoteSource};
use crate::providers::util::with_retry;

/// Monthly bars sit at local midnight on the first of the month. Historical DST
/// changes can leave them an hour short of that after applying today's offset.
const MONTH_SNAP_SECS: i64 = 3 * 3600;

fn unix_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn extract_monthly_closes(item: &ChartItem) -> QuoteSeries {
    let (Some(timestamps), Some(closes)) = (
        item.timestamp.as_ref(),
        item.indicators
            .as_ref()
            .and_then(|inds| inds.quote.first())
            .and_then(|q| q.close.as_ref()),
    ) else {
        return QuoteSeries::empty();
    };

    let offset = item.meta.gmt_offset.unwrap_or(0);
    QuoteSeries::new(timestamps.iter().zip(closes).filter_map(|(ts, close)| {
        let close = (*close)?;
        let local = Utc
            .timestamp_opt(ts + offset + MONTH_SNAP_SECS, 0)
            .single()?;
        Some(QuotePoint {
            month: Month::from_date(local.date_naive()),
            close,
        })
    }))
}

/// Monthly closing prices from the Yahoo Finance chart API.
pub struct YahooQuoteSource {
    base_url: String,
    retries: usize,
    retry_delay_ms: u64,
}

impl YahooQuoteSource {
    pub fn new(base_url: &str) -> Self {
        YahooQuoteSource {
            base_url: base_url.to_string(),
            retries: 0,
            retry_delay_ms: 0,
        }
    }

    pub fn from_config(config: &YahooProviderConfig) -> Self {
        YahooQuoteSource {
            base_url: config.base_url.clone(),
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        }
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    #[serde(rename = "gmtoffset")]
    gmt_offset: Option<i64>,
}

#[async_trait]
impl QuoteSource for YahooQuoteSource {
    #[instrument(
        name = "YahooQuoteFetch",
        skip(self),
        fields(ticker = %ticker, start = %start, end = %end)
    )]
    async fn fetch(&self, ticker: &str, start: Month, end: NaiveDate) -> Result<QuoteSeries> {
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1mo&events=history",
            self.base_url,
            ticker,
            unix_timestamp(start.first_day()),
            unix_timestamp(end)
        );
        debug!("Requesting monthly quotes from {}", url);

        let client = reqwest::Client::builder().user_agent("fxsim/1.0").build()?;
        let response = with_retry(
            || client.get(&url).send(),
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .map_err(|e| anyhow!("Request error: {} for ticker: {} URL: {}", e, ticker, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for ticker: {}",
                response.status(),
                ticker
            ));
        }

        let text = response.text().await?;
        let data: YahooChartResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", ticker, e))?;

        if let Some(error) = data.chart.error {
            return Err(anyhow!(
                "Yahoo error {} for ticker {}: {}",
                error.code,
                ticker,
                error.description
            ));
        }

        let item = data
            .chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| anyhow!("No quote data found for ticker: {}", ticker))?;

        let series = extract_monthly_closes(&item).between(start, end);
        debug!(points = series.len(), "Parsed monthly closes");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(ticker: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{ticker}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .and(query_param("interval", "1mo"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn ts(year: i32, month: u32) -> i64 {
        unix_timestamp(NaiveDate::from_ymd_opt(year, month, 1).unwrap())
    }

    fn month(s: &str) -> Month {
        s.parse().unwrap()
    }

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    #[tokio::test]
    async fn test_successful_monthly_fetch() {
        let mock_response = format!(
            r#"{{
                "chart": {{
                    "result": [{{
                        "meta": {{ "currency": "BRL", "gmtoffset": 0 }},
                        "timestamp": [{}, {}, {}, {}],
                        "indicators": {{
                            "quote": [{{ "close": [5.01, null, 5.20, 5.35] }}]
                        }}
                    }}],
                    "error": null
                }}
            }}"#,
            ts(2020, 1),
            ts(2020, 2),
            ts(2020, 3),
            ts(2020, 4)
        );

        let mock_server = create_mock_server("USDBRL=X", &mock_response).await;
        let provider = YahooQuoteSource::new(&mock_server.uri());
        let series = provider
            .fetch("USDBRL=X", month("2020-01"), end())
            .await
            .unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.close_at(month("2020-01")), Some(5.01));
        assert!(!series.has_month(month("2020-02")));
        assert_eq!(series.close_at(month("2020-04")), Some(5.35));
    }

    #[tokio::test]
    async fn test_bars_before_local_midnight_land_in_their_month() {
        // 2015-07-31T23:00:00Z is 2015-08-01 00:00 in London summer time.
        let mock_response = format!(
            r#"{{
                "chart": {{
                    "result": [{{
                        "meta": {{ "gmtoffset": 3600 }},
                        "timestamp": [{}],
                        "indicators": {{ "quote": [{{ "close": [3.45] }}] }}
                    }}]
                }}
            }}"#,
            ts(2015, 8) - 3600
        );

        let mock_server = create_mock_server("USDBRL=X", &mock_response).await;
        let provider = YahooQuoteSource::new(&mock_server.uri());
        let series = provider
            .fetch("USDBRL=X", month("2015-08"), end())
            .await
            .unwrap();

        assert_eq!(series.first_month(), Some(month("2015-08")));
    }

    #[tokio::test]
    async fn test_points_outside_range_are_dropped() {
        let mock_response = format!(
            r#"{{
                "chart": {{
                    "result": [{{
                        "meta": {{}},
                        "timestamp": [{}, {}, {}],
                        "indicators": {{ "quote": [{{ "close": [1.0, 2.0, 3.0] }}] }}
                    }}]
                }}
            }}"#,
            ts(2025, 3),
            ts(2025, 4),
            ts(2025, 5)
        );

        let mock_server = create_mock_server("EURBRL=X", &mock_response).await;
        let provider = YahooQuoteSource::new(&mock_server.uri());
        let series = provider
            .fetch("EURBRL=X", month("2025-04"), end())
            .await
            .unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series.close_at(month("2025-04")), Some(2.0));
    }

    #[tokio::test]
    async fn test_missing_bars_yield_empty_series() {
        let mock_response = r#"{"chart": {"result": [{"meta": {"currency": "BRL"}}]}}"#;
        let mock_server = create_mock_server("CADBRL=X", mock_response).await;
        let provider = YahooQuoteSource::new(&mock_server.uri());

        let series = provider
            .fetch("CADBRL=X", month("2015-08"), end())
            .await
            .unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_no_quote_result_data() {
        let mock_response = r#"{"chart": {"result": []}}"#;
        let mock_server = create_mock_server("INVALID", mock_response).await;
        let provider = YahooQuoteSource::new(&mock_server.uri());

        let result = provider.fetch("INVALID", month("2015-08"), end()).await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "No quote data found for ticker: INVALID"
        );
    }

    #[tokio::test]
    async fn test_yahoo_error_payload() {
        let mock_response = r#"{
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        }"#;
        let mock_server = create_mock_server("XXXBRL=X", mock_response).await;
        let provider = YahooQuoteSource::new(&mock_server.uri());

        let result = provider.fetch("XXXBRL=X", month("2015-08"), end()).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Yahoo error Not Found for ticker XXXBRL=X: No data found, symbol may be delisted"
        );
    }

    #[tokio::test]
    async fn test_http_error_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/USDBRL=X"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        let provider = YahooQuoteSource::new(&mock_server.uri());

        let result = provider.fetch("USDBRL=X", month("2015-08"), end()).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for ticker: USDBRL=X"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_response = r#"{"chart": {"results": []}}"#;
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/USDBRL=X"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;
        let provider = YahooQuoteSource::new(&mock_server.uri());

        let result = provider.fetch("USDBRL=X", month("2015-08"), end()).await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for USDBRL=X")
        );

        // A response without "result" or "error" parses but carries no data.
        let other_server = create_mock_server("EURBRL=X", mock_response).await;
        let provider = YahooQuoteSource::new(&other_server.uri());
        let result = provider.fetch("EURBRL=X", month("2015-08"), end()).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "No quote data found for ticker: EURBRL=X"
        );
    }

    #[test]
    fn test_from_config_uses_retry_policy() {
        let config = YahooProviderConfig {
            base_url: "http://localhost".to_string(),
            retries: 4,
            retry_delay_ms: 25,
        };
        let provider = YahooQuoteSource::from_config(&config);
        assert_eq!(provider.base_url, "http://localhost");
        assert_eq!(provider.retries, 4);
        assert_eq!(provider.retry_delay_ms, 25);
    }
}
