//! Polygon daily aggregates.

use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use crate::data::cache::{DatedSeries, SeriesSource};
use crate::data::http::{HttpGet, RetryPolicy, get_json};
use crate::error::AppError;

pub const BASE_URL: &str = "https://api.polygon.io";

/// Retry budget for aggregate downloads.
pub const AGGS_POLICY: RetryPolicy = RetryPolicy::new(4, Duration::from_secs(2));
/// Retry budget for the key check.
pub const VALIDATE_POLICY: RetryPolicy = RetryPolicy::new(2, Duration::from_secs(1));

#[derive(Debug, Deserialize)]
struct AggsResponse {
    #[serde(default)]
    results: Vec<AggBar>,
}

#[derive(Debug, Deserialize)]
struct AggBar {
    /// Bar start, milliseconds since the Unix epoch.
    t: Option<i64>,
    /// Close.
    c: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Check that `api_key` can reach the reference endpoint.
///
/// `Err` carries a human-readable reason; a rejected key reports the status
/// Polygon returned alongside its error text.
pub fn validate_key(http: &dyn HttpGet, api_key: Option<&str>, policy: RetryPolicy) -> Result<(), String> {
    let Some(key) = api_key else {
        return Err("No POLYGON_API_KEY set.".to_string());
    };
    let url = format!("{BASE_URL}/v3/reference/tickers");
    let query = [
        ("active", "true".to_string()),
        ("limit", "1".to_string()),
        ("apiKey", key.to_string()),
    ];
    let Some(resp) = get_json::<StatusResponse>(http, &url, &query, policy) else {
        return Err("No response (network or service).".to_string());
    };
    if resp.status.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("ok")) {
        return Ok(());
    }
    let status = resp.status.as_deref().unwrap_or("missing");
    let detail = resp
        .error
        .or(resp.message)
        .unwrap_or_else(|| "Unknown error/plan".to_string());
    Err(format!("status {status}: {detail}"))
}

/// Adjusted daily closes from the aggregates endpoint.
pub struct PolygonSource<'a> {
    http: &'a dyn HttpGet,
    api_key: String,
    policy: RetryPolicy,
}

impl<'a> PolygonSource<'a> {
    pub fn new(http: &'a dyn HttpGet, api_key: String, policy: RetryPolicy) -> Self {
        Self {
            http,
            api_key,
            policy,
        }
    }
}

impl SeriesSource for PolygonSource<'_> {
    fn name(&self) -> &str {
        "polygon"
    }

    fn fetch(&self, key: &str, start: NaiveDate, end: NaiveDate) -> Result<Option<DatedSeries>, AppError> {
        let url = format!("{BASE_URL}/v2/aggs/ticker/{key}/range/1/day/{start}/{end}");
        let query = [
            ("adjusted", "true".to_string()),
            ("sort", "asc".to_string()),
            ("limit", "50000".to_string()),
            ("apiKey", self.api_key.clone()),
        ];
        let Some(resp) = get_json::<AggsResponse>(self.http, &url, &query, self.policy) else {
            return Ok(None);
        };

        let points: Vec<(NaiveDate, f64)> = resp
            .results
            .iter()
            .filter_map(|bar| {
                let date = DateTime::from_timestamp_millis(bar.t?)?.naive_utc().date();
                Some((date, bar.c?))
            })
            .collect();
        if points.is_empty() {
            return Ok(None);
        }
        Ok(Some(DatedSeries::new(key, points)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::http::testing::ScriptedHttp;

    const ONCE: RetryPolicy = RetryPolicy::new(1, Duration::ZERO);

    #[test]
    fn parses_millisecond_bars() {
        // 2021-01-04 and 2021-01-05 (UTC midnight).
        let http = ScriptedHttp::with(vec![ScriptedHttp::ok(
            r#"{"status":"OK","results":[{"t":1609718400000,"c":129.41},{"t":1609804800000,"c":131.01},{"t":1609891200000}]}"#,
        )]);
        let source = PolygonSource::new(&http, "k".into(), ONCE);
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 1, 31).unwrap();
        let series = source.fetch("AAPL", start, end).unwrap().unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.points[0].0, NaiveDate::from_ymd_opt(2021, 1, 4).unwrap());
        assert_eq!(series.points[1].1, 131.01);
        assert!(http.calls.borrow()[0].contains("/v2/aggs/ticker/AAPL/range/1/day/2021-01-01/2021-01-31"));
    }

    #[test]
    fn empty_results_are_no_data() {
        let http = ScriptedHttp::with(vec![ScriptedHttp::ok(r#"{"status":"OK","resultsCount":0}"#)]);
        let source = PolygonSource::new(&http, "k".into(), ONCE);
        let day = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        assert!(source.fetch("ZZZZ", day, day).unwrap().is_none());
    }

    #[test]
    fn validation_reports_reason() {
        assert!(validate_key(&ScriptedHttp::default(), None, ONCE).is_err());

        let ok = ScriptedHttp::with(vec![ScriptedHttp::ok(r#"{"status":"OK","results":[]}"#)]);
        assert_eq!(validate_key(&ok, Some("k"), ONCE), Ok(()));

        let denied = ScriptedHttp::with(vec![ScriptedHttp::ok(
            r#"{"status":"NOT_AUTHORIZED","message":"plan does not include this data"}"#,
        )]);
        assert_eq!(
            validate_key(&denied, Some("k"), ONCE),
            Err("status NOT_AUTHORIZED: plan does not include this data".to_string())
        );

        let bare = ScriptedHttp::with(vec![ScriptedHttp::ok(r#"{"results":[]}"#)]);
        assert_eq!(
            validate_key(&bare, Some("k"), ONCE),
            Err("status missing: Unknown error/plan".to_string())
        );
    }
}
