//! The monthly build:
//! FRED macro -> monthly closes -> benchmark/basket returns -> per-ticker
//! features -> combined frame -> guarded OLS per ticker.
//!
//! Every intermediate frame is written under `Monthly/` as it is produced.
//! Diagnostics are collected as formatted blocks so the caller decides how
//! to print them.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::Settings;
use crate::data::{HttpGet, PriceLoader};
use crate::domain::MonthlyFrame;
use crate::error::AppError;
use crate::features::{
    AI_BASKET_COLUMN, ai_basket_returns, benchmark_returns, build_features, combine_features, load_macro_frame,
};
use crate::fit::{RegressionGuard, RegressionOutcome, regress_ticker};
use crate::io::write_frame_csv;
use crate::report::format_diagnostics;

pub const MACRO_FILE: &str = "macro_monthly.csv";
pub const AI_BASKET_FILE: &str = "ai_basket_rets.csv";
pub const COMBINED_FILE: &str = "tech_features_combined.csv";

pub fn benchmark_file(name: &str) -> String {
    format!("{name}_rets.csv")
}

pub fn features_file(ticker: &str) -> String {
    format!("{ticker}_features_enriched.csv")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildOptions {
    pub strict_benchmarks: bool,
    pub run_models: bool,
}

/// All computed outputs of a `tm build` run.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub macro_frame: MonthlyFrame,
    pub per_ticker: Vec<(String, MonthlyFrame)>,
    pub combined: MonthlyFrame,
    pub regressions: Vec<(String, RegressionOutcome)>,
    /// Formatted `[Diag]` blocks in the order the frames were written.
    pub diagnostics: Vec<String>,
    pub written: Vec<PathBuf>,
}

struct Writer {
    dir: PathBuf,
    diagnostics: Vec<String>,
    written: Vec<PathBuf>,
}

impl Writer {
    fn save(&mut self, label: &str, file: &str, frame: &MonthlyFrame) -> Result<(), AppError> {
        self.diagnostics.push(format_diagnostics(label, frame));
        let path = self.dir.join(file);
        write_frame_csv(&path, frame)?;
        self.written.push(path);
        Ok(())
    }
}

/// Execute the full monthly build.
pub fn run_build(settings: &Settings, http: &dyn HttpGet, options: BuildOptions) -> Result<BuildOutput, AppError> {
    info!("{}", settings.key_summary());
    if (settings.enable_news || settings.enable_earnings) && settings.finnhub_api_key.is_none() {
        warn!("ENABLE_NEWS/ENABLE_EARNINGS set but FINNHUB_API_KEY is missing; no news or earnings features are built");
    }

    let mut out = Writer {
        dir: settings.monthly_dir(),
        diagnostics: Vec::new(),
        written: Vec::new(),
    };

    // 1) Macro covariates.
    let macro_frame = load_macro_frame(settings, http)?;
    out.save("macro monthly", MACRO_FILE, &macro_frame)?;

    // 2) Month-end closes for benchmarks, basket members, and tickers.
    let loader = PriceLoader::new(settings, http)?;
    let closes = loader.monthly_closes(&settings.all_price_tickers())?;

    // 3) Benchmark and basket returns.
    let benchmarks = benchmark_returns(&closes, &settings.benchmarks, &macro_frame.index, options.strict_benchmarks)?;
    let mut joinable = Vec::with_capacity(benchmarks.len() + 1);
    for (bench, frame) in benchmarks {
        out.save(&bench.return_column(), &benchmark_file(&bench.name), &frame)?;
        joinable.push(frame);
    }
    let basket = ai_basket_returns(&closes, &settings.ai_basket, &macro_frame.index);
    out.save(AI_BASKET_COLUMN, AI_BASKET_FILE, &basket)?;
    joinable.push(basket);

    // 4) Per-ticker feature frames.
    let mut per_ticker = Vec::with_capacity(settings.tickers.len());
    for ticker in &settings.tickers {
        let frame = build_features(ticker, &closes, &macro_frame, &joinable, &settings.lags);
        out.save(&format!("{ticker} features"), &features_file(ticker), &frame)?;
        per_ticker.push((ticker.clone(), frame));
    }

    // 5) Combined frame.
    let combined = combine_features(&per_ticker);
    if combined.is_empty() {
        return Err(AppError::no_data(
            "No feature rows could be constructed (no prices and no macro data).",
        ));
    }
    out.save("combined", COMBINED_FILE, &combined)?;

    // 6) Advisory regressions.
    let guard = RegressionGuard {
        min_rows: settings.min_rows,
        max_covariates: settings.max_covariates,
    };
    let regressions = if options.run_models {
        per_ticker
            .iter()
            .map(|(ticker, frame)| (ticker.clone(), regress_ticker(frame, ticker, guard)))
            .collect()
    } else {
        Vec::new()
    };

    Ok(BuildOutput {
        macro_frame,
        per_ticker,
        combined,
        regressions,
        diagnostics: out.diagnostics,
        written: out.written,
    })
}
