//! Yahoo Finance v8 chart endpoint (no key).
//!
//! Adjusted closes are preferred; raw closes fill positions where Yahoo has
//! no adjusted value.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::warn;

use crate::data::cache::{DatedSeries, SeriesSource};
use crate::data::http::{HttpGet, RetryPolicy, get_json};
use crate::error::AppError;

pub const BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

pub struct YahooSource<'a> {
    http: &'a dyn HttpGet,
    policy: RetryPolicy,
}

impl<'a> YahooSource<'a> {
    pub fn new(http: &'a dyn HttpGet, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }
}

impl SeriesSource for YahooSource<'_> {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn fetch(&self, key: &str, start: NaiveDate, end: NaiveDate) -> Result<Option<DatedSeries>, AppError> {
        let (Some(from), Some(to)) = (start.and_hms_opt(0, 0, 0), end.and_hms_opt(23, 59, 59)) else {
            return Ok(None);
        };
        let url = format!("{BASE_URL}/{key}");
        let query = [
            ("period1", from.and_utc().timestamp().to_string()),
            ("period2", to.and_utc().timestamp().to_string()),
            ("interval", "1d".to_string()),
            ("includeAdjustedClose", "true".to_string()),
        ];
        let Some(resp) = get_json::<ChartResponse>(self.http, &url, &query, self.policy) else {
            return Ok(None);
        };

        let points = match parse_chart(resp) {
            Ok(points) => points,
            Err(reason) => {
                warn!(ticker = key, reason = %reason, "unusable Yahoo chart response");
                return Ok(None);
            }
        };
        if points.is_empty() {
            return Ok(None);
        }
        Ok(Some(DatedSeries::new(key, points)))
    }
}

fn parse_chart(resp: ChartResponse) -> Result<Vec<(NaiveDate, f64)>, String> {
    let Some(results) = resp.chart.result else {
        return Err(match resp.chart.error {
            Some(err) => format!("{}: {}", err.code, err.description),
            None => "empty result with no error".to_string(),
        });
    };
    let data = results.into_iter().next().ok_or("result array is empty")?;
    let timestamps = data.timestamp.unwrap_or_default();

    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();
    let adj = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let points = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let date = DateTime::from_timestamp(ts, 0)?.naive_utc().date();
            let value = adj
                .get(i)
                .copied()
                .flatten()
                .or_else(|| closes.get(i).copied().flatten())?;
            value.is_finite().then_some((date, value))
        })
        .collect();
    Ok(points)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::data::http::testing::ScriptedHttp;

    const ONCE: RetryPolicy = RetryPolicy::new(1, Duration::ZERO);

    #[test]
    fn adjusted_close_preferred_with_close_fallback() {
        let body = r#"{"chart":{"result":[{"timestamp":[1609770600,1609857000,1609943400],
            "indicators":{"quote":[{"close":[129.41,131.01,null]}],
            "adjclose":[{"adjclose":[127.0,null,null]}]}}],"error":null}}"#;
        let http = ScriptedHttp::with(vec![ScriptedHttp::ok(body)]);
        let source = YahooSource::new(&http, ONCE);
        let day = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let series = source.fetch("AAPL", day, day).unwrap().unwrap();

        assert_eq!(series.values(), vec![127.0, 131.01]);
        assert_eq!(series.points[0].0, NaiveDate::from_ymd_opt(2021, 1, 4).unwrap());
    }

    #[test]
    fn chart_error_is_no_data() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let http = ScriptedHttp::with(vec![ScriptedHttp::ok(body)]);
        let source = YahooSource::new(&http, ONCE);
        let day = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        assert!(source.fetch("NOPE", day, day).unwrap().is_none());
    }
}
