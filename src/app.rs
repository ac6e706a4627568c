//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - initialises logging
//! - builds `Settings` from the environment and CLI overrides
//! - dispatches to the pipelines and prints their reports

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{BuildArgs, Cli, Command, GlobalArgs, IngestArgs, ModelArgs};
use crate::config::Settings;
use crate::data::fred::macro_series_ids;
use crate::data::ReqwestTransport;
use crate::error::AppError;
use crate::report::{format_column_preview, format_correlation, format_regression, format_tail};

pub mod daily;
pub mod offline;
pub mod pipeline;

/// Entry point for the `tm` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();
    let cli = Cli::parse();
    let settings = apply_overrides(Settings::from_env(), &cli.global);

    match cli.command {
        Command::Build(args) => handle_build(&settings, &args),
        Command::Ingest(args) => handle_ingest(&settings, &args),
        Command::Rebuild => handle_rebuild(&settings),
        Command::Model(args) => handle_model(&settings, &args),
        Command::Fred(args) => {
            let ids = args.series.unwrap_or_else(macro_series_ids);
            let http = ReqwestTransport::new()?;
            let (series, summary) = daily::run_fred(&settings, &http, &ids)?;
            print!("{}", daily::format_series_lines(&series));
            println!("{}", summary.line());
            Ok(())
        }
        Command::Prices => {
            let http = ReqwestTransport::new()?;
            let (summary, path) = daily::run_prices(&settings, &http)?;
            println!("{}", summary.line());
            println!("Saved → {}", path.display());
            Ok(())
        }
        Command::Corr => {
            let http = ReqwestTransport::new()?;
            let corr = daily::run_corr(&settings, &http)?;
            println!("Daily return correlation ({} complete days):", corr.n_days);
            print!("{}", format_correlation(&corr.names, &corr.matrix));
            println!("Saved → {}", corr.path.display());
            Ok(())
        }
        Command::Plot(args) => {
            let http = ReqwestTransport::new()?;
            let plot = daily::run_plot(&settings, &http, args.width, args.height)?;
            println!("{plot}");
            Ok(())
        }
    }
}

/// `RUST_LOG` wins; otherwise `info`.
fn init_tracing() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// CLI flags override the environment-derived settings.
pub fn apply_overrides(mut settings: Settings, args: &GlobalArgs) -> Settings {
    if let Some(dir) = &args.cache_dir {
        settings.cache_dir = dir.clone();
    }
    if let Some(start) = args.start {
        settings.start = start;
    }
    if let Some(end) = args.end {
        settings.end = end;
    }
    if let Some(tickers) = &args.tickers {
        settings.tickers = tickers
            .iter()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty())
            .collect();
    }
    if args.force_refresh {
        settings.force_refresh = true;
    }
    if let Some(provider) = args.provider {
        settings.provider = provider;
    }
    settings
}

fn handle_build(settings: &Settings, args: &BuildArgs) -> Result<(), AppError> {
    let http = ReqwestTransport::new()?;
    let options = pipeline::BuildOptions {
        strict_benchmarks: args.strict_benchmarks,
        run_models: !args.no_model,
    };
    let run = pipeline::run_build(settings, &http, options)?;

    for block in &run.diagnostics {
        println!("{block}");
    }
    for (ticker, outcome) in &run.regressions {
        println!("{}", format_regression(ticker, outcome));
    }
    println!("Saved {} file(s) under {}", run.written.len(), settings.monthly_dir().display());
    Ok(())
}

fn handle_ingest(settings: &Settings, args: &IngestArgs) -> Result<(), AppError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| settings.monthly_dir().join(pipeline::COMBINED_FILE));
    let report = crate::ingest::ingest_workbook(&args.input, args.sheet.as_deref(), &output)?;
    print!("{}", report.render());
    Ok(())
}

fn handle_rebuild(settings: &Settings) -> Result<(), AppError> {
    let run = offline::run_rebuild(settings)?;
    println!("Saved → {}", run.path.display());
    println!(
        "{}",
        format_column_preview("Columns", &run.combined.column_names(), 20)
    );
    Ok(())
}

fn handle_model(settings: &Settings, args: &ModelArgs) -> Result<(), AppError> {
    let run = offline::run_model(settings, args.input.as_deref(), args.min_periods)?;
    println!("Return columns detected: {:?}", run.return_columns);
    println!("Saved → {}", run.correlation_path.display());
    println!();
    let avg = run.frame.numeric(offline::AVG_RET_COLUMN).unwrap_or_default();
    print!("{}", format_tail(offline::AVG_RET_COLUMN, &run.frame.index, avg, args.tail));
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::ProviderMode;

    #[test]
    fn overrides_replace_only_given_values() {
        let base = Settings {
            force_refresh: false,
            ..Settings::default()
        };
        let args = GlobalArgs {
            cache_dir: Some(PathBuf::from("/tmp/tm")),
            tickers: Some(vec![" aapl".into(), "".into(), "nvda".into()]),
            provider: Some(ProviderMode::Yahoo),
            ..GlobalArgs::default()
        };
        let s = apply_overrides(base.clone(), &args);
        assert_eq!(s.cache_dir, PathBuf::from("/tmp/tm"));
        assert_eq!(s.tickers, vec!["AAPL", "NVDA"]);
        assert_eq!(s.provider, ProviderMode::Yahoo);
        assert_eq!(s.start, base.start);
        assert!(!s.force_refresh);
    }
}
