//! Command-line parsing for the monthly tech feature builder.
//!
//! Argument parsing and command dispatch stay separate from the data and
//! modeling code; `app` turns these structs into `Settings` overrides.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::config::ProviderMode;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tm", version, about = "Monthly tech-equity features from FRED and Polygon/Yahoo prices")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides shared by every command. Unset flags keep the environment /
/// default values.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Cache root (monthly outputs go to `<dir>/Monthly`, daily prices to `<dir>/raw`).
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// First date requested from providers (YYYY-MM-DD).
    #[arg(long, global = true)]
    pub start: Option<NaiveDate>,

    /// Last date requested from providers (YYYY-MM-DD, default today).
    #[arg(long, global = true)]
    pub end: Option<NaiveDate>,

    /// Tickers to process (comma-separated).
    #[arg(long, global = true, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Ignore cached series and download again (same as FORCE_REFRESH=1).
    #[arg(long, global = true)]
    pub force_refresh: bool,

    /// Price provider selection.
    #[arg(long, global = true, value_enum)]
    pub provider: Option<ProviderMode>,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full monthly build: macro, benchmarks, per-ticker features, combined file, OLS.
    Build(BuildArgs),
    /// Ingest a workbook (or CSV) into a month-end indexed combined file.
    Ingest(IngestArgs),
    /// Re-assemble the combined file from the per-ticker/benchmark/macro CSVs.
    Rebuild,
    /// Offline model on the combined file: return correlations and average return.
    Model(ModelArgs),
    /// Download FRED series into the cache.
    Fred(FredArgs),
    /// Download daily closes into the cache.
    Prices,
    /// Daily close-to-close return correlation from cached prices.
    Corr,
    /// ASCII chart of daily closes rebased to 100.
    Plot(PlotArgs),
}

#[derive(Debug, Clone, Args)]
pub struct BuildArgs {
    /// Fail when a benchmark has no prices instead of using an empty column.
    #[arg(long)]
    pub strict_benchmarks: bool,

    /// Skip the per-ticker regressions.
    #[arg(long)]
    pub no_model: bool,
}

#[derive(Debug, Clone, Args)]
pub struct IngestArgs {
    /// Workbook (xlsx/xls/ods) or CSV to ingest.
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Sheet to read (default: `tech_features_combined` if present, else the first).
    #[arg(long)]
    pub sheet: Option<String>,

    /// Output CSV (default: `<cache-dir>/Monthly/tech_features_combined.csv`).
    #[arg(long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ModelArgs {
    /// Combined CSV (default: `<cache-dir>/Monthly/tech_features_combined.csv`).
    #[arg(long, value_name = "CSV")]
    pub input: Option<PathBuf>,

    /// Minimum overlapping observations per correlation pair.
    #[arg(long, default_value_t = 6)]
    pub min_periods: usize,

    /// Rows of `avg_ret` to print.
    #[arg(long, default_value_t = 5)]
    pub tail: usize,
}

#[derive(Debug, Clone, Args)]
pub struct FredArgs {
    /// Series ids (comma-separated; default FEDFUNDS,CPIAUCSL,DGS10,UNRATE).
    #[arg(long, value_delimiter = ',')]
    pub series: Option<Vec<String>>,
}

#[derive(Debug, Clone, Args)]
pub struct PlotArgs {
    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "tm",
            "build",
            "--strict-benchmarks",
            "--tickers",
            "AAPL,MSFT",
            "--start",
            "2020-01-01",
            "--provider",
            "yahoo",
        ]);
        assert_eq!(cli.global.tickers, Some(vec!["AAPL".to_string(), "MSFT".to_string()]));
        assert_eq!(cli.global.start, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(cli.global.provider, Some(ProviderMode::Yahoo));
        match cli.command {
            Command::Build(args) => assert!(args.strict_benchmarks && !args.no_model),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ingest_takes_a_positional_file() {
        let cli = Cli::parse_from(["tm", "--cache-dir", "/tmp/c", "ingest", "book.xlsx", "--sheet", "Data"]);
        let Command::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(args.input, PathBuf::from("book.xlsx"));
        assert_eq!(args.sheet.as_deref(), Some("Data"));
        assert_eq!(cli.global.cache_dir, Some(PathBuf::from("/tmp/c")));
    }
}
