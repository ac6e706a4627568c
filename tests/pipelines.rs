//! End-to-end runs of the pipelines against a temporary cache directory.
//! Network access goes through a fake transport that has no data.

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{Months, NaiveDate};

use tech_monthly::app::offline::{run_model, run_rebuild};
use tech_monthly::app::pipeline::{BuildOptions, run_build};
use tech_monthly::config::{Benchmark, ProviderMode, Settings};
use tech_monthly::data::{DatedSeries, DiskCache, FetchError, HttpGet, HttpResponse};
use tech_monthly::error::{EXIT_CONFIG, EXIT_MISSING_INPUT, EXIT_NO_DATA};
use tech_monthly::fit::RegressionOutcome;
use tech_monthly::io::read_frame_csv;

/// Answers every request with Yahoo's "no data" chart payload.
#[derive(Default)]
struct NoDataHttp {
    calls: Cell<usize>,
}

impl HttpGet for NoDataHttp {
    fn get(&self, _url: &str, _query: &[(&str, String)]) -> Result<HttpResponse, FetchError> {
        self.calls.set(self.calls.get() + 1);
        Ok(HttpResponse {
            status: 200,
            body: r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#.to_string(),
        })
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn monthly(day: u32, f: impl Fn(u32) -> f64) -> Vec<(NaiveDate, f64)> {
    (0..36).map(|m| (d(2019, 1, day) + Months::new(m), f(m))).collect()
}

fn settings(dir: &Path) -> Settings {
    Settings {
        cache_dir: dir.to_path_buf(),
        start: d(2019, 1, 1),
        end: d(2021, 12, 31),
        tickers: vec!["AAPL".into(), "MSFT".into()],
        ai_basket: vec!["NVDA".into(), "AMD".into()],
        benchmarks: vec![Benchmark::new("QQQ", "ixic"), Benchmark::new("XLK", "xlk")],
        pacing: Duration::ZERO,
        provider: ProviderMode::Yahoo,
        ..Settings::default()
    }
}

/// FRED and price caches for 2019-01 .. 2021-12; MSFT and AMD are absent.
fn seed_cache(dir: &Path) {
    let fred = DiskCache::fred(dir);
    let store = |cache: &DiskCache, key: &str, points| cache.store(&DatedSeries::new(key, points)).unwrap();
    store(&fred, "FEDFUNDS", monthly(1, |m| 1.0 + 0.05 * m as f64));
    store(&fred, "CPIAUCSL", monthly(1, |m| 250.0 + 0.5 * m as f64 + (m % 4) as f64 * 0.1));
    store(&fred, "DGS10", monthly(1, |m| 2.0 + ((m * 7) % 5) as f64 * 0.1));
    store(&fred, "UNRATE", monthly(1, |m| 4.0 + (m % 6) as f64 * 0.1));

    let prices = DiskCache::daily_prices(dir.join("raw"));
    store(&prices, "QQQ", monthly(15, |m| 200.0 + 2.0 * m as f64 + (m % 5) as f64));
    store(&prices, "XLK", monthly(15, |m| 80.0 + m as f64 + (m % 3) as f64 * 0.7));
    store(&prices, "NVDA", monthly(15, |m| 50.0 + 1.5 * m as f64 + ((m * 3) % 7) as f64));
    store(&prices, "AAPL", monthly(15, |m| 100.0 * (1.0 + 0.01 * m as f64) + (m % 3) as f64));
}

#[test]
fn build_from_warm_cache_writes_every_output() {
    let dir = tempfile::tempdir().unwrap();
    seed_cache(dir.path());
    let settings = settings(dir.path());
    let http = NoDataHttp::default();

    let options = BuildOptions {
        strict_benchmarks: false,
        run_models: true,
    };
    let run = run_build(&settings, &http, options).unwrap();

    // Only the two uncached tickers reach the network; FRED needs no key.
    assert_eq!(http.calls.get(), 2);

    let monthly_dir = settings.monthly_dir();
    for file in [
        "macro_monthly.csv",
        "ixic_rets.csv",
        "xlk_rets.csv",
        "ai_basket_rets.csv",
        "AAPL_features_enriched.csv",
        "MSFT_features_enriched.csv",
        "tech_features_combined.csv",
    ] {
        assert!(monthly_dir.join(file).exists(), "{file} missing");
    }
    assert_eq!(run.written.len(), 7);
    assert_eq!(run.diagnostics.len(), 7);

    let (_, aapl) = &run.per_ticker[0];
    assert_eq!(aapl.len(), 30);
    assert_eq!(aapl.index[0], d(2019, 7, 31));
    assert!(aapl.contains("ixic_ret"));
    assert!(aapl.contains("inflation_yoy_lag6"));

    let (_, msft) = &run.per_ticker[1];
    assert!(msft.numeric("MSFT_ret").unwrap().iter().all(|v| v.is_nan()));

    assert!(run.combined.contains("AAPL.AAPL_ret"));
    assert!(run.combined.contains("MSFT.us10y_lag3"));

    let combined = read_frame_csv(&monthly_dir.join("tech_features_combined.csv")).unwrap();
    assert_eq!(combined.len(), run.combined.len());

    assert_eq!(run.regressions.len(), 2);
    assert!(matches!(run.regressions[1].1, RegressionOutcome::Skipped(_)));
}

#[test]
fn strict_benchmarks_fail_without_prices() {
    let dir = tempfile::tempdir().unwrap();
    seed_cache(dir.path());
    fs::remove_file(dir.path().join("raw").join("XLK_daily.csv")).unwrap();
    let settings = settings(dir.path());

    let options = BuildOptions {
        strict_benchmarks: true,
        run_models: false,
    };
    let err = run_build(&settings, &NoDataHttp::default(), options).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_NO_DATA);
    assert!(err.message().contains("XLK"));
}

#[test]
fn rebuild_then_model() {
    let dir = tempfile::tempdir().unwrap();
    seed_cache(dir.path());
    let settings = settings(dir.path());
    run_build(&settings, &NoDataHttp::default(), BuildOptions::default()).unwrap();

    let rebuilt = run_rebuild(&settings).unwrap();
    assert_eq!(rebuilt.sources.len(), 6);
    let names = rebuilt.combined.column_names();
    assert_eq!(&names[..3], &["ixic_ret", "xlk_ret", "ai_basket_ret"]);
    assert!(names.contains(&"cpi_index"));
    assert!(names.contains(&"AAPL_ret"));
    assert!(names.contains(&"MSFT_ret"));
    assert_eq!(names.iter().filter(|n| **n == "ixic_ret").count(), 1);

    let model = run_model(&settings, None, 6).unwrap();
    assert_eq!(
        model.return_columns,
        vec!["ixic_ret", "xlk_ret", "ai_basket_ret", "AAPL_ret", "MSFT_ret"]
    );
    assert!(model.correlation_path.exists());
    assert!((model.correlation[0][0] - 1.0).abs() < 1e-12);
    assert!(model.correlation[4][4].is_nan());
    assert!(model.frame.contains("avg_ret"));
}

#[test]
fn model_exit_codes() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());

    let err = run_model(&settings, None, 6).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_MISSING_INPUT);

    let no_prices = dir.path().join("macro.csv");
    fs::write(&no_prices, "date,cpi_index\n2021-01-31,260\n2021-02-28,261\n").unwrap();
    let err = run_model(&settings, Some(&no_prices), 6).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_CONFIG);

    let sparse = dir.path().join("sparse.csv");
    fs::write(&sparse, "date,AAPL\n2021-01-31,150\n2021-02-28,\n2021-03-31,151\n").unwrap();
    let err = run_model(&settings, Some(&sparse), 6).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_NO_DATA);
}

#[test]
fn model_derives_returns_from_prices() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(dir.path());
    let input = dir.path().join("combined.csv");
    fs::write(
        &input,
        "date,AAPL Close,MSFT\n2021-01-29,100,200\n2021-02-26,110,210\n2021-03-31,121,220.5\n",
    )
    .unwrap();

    let model = run_model(&settings, Some(&input), 2).unwrap();
    assert_eq!(model.return_columns, vec!["AAPL_ret", "MSFT_ret"]);
    let avg = model.frame.numeric("avg_ret").unwrap();
    assert!(avg[0].is_nan());
    assert!((avg[1] - 0.075).abs() < 1e-12);
    assert!((avg[2] - 0.075).abs() < 1e-12);
}
