//! Monthly macro covariates from FRED.

use tracing::warn;

use crate::config::Settings;
use crate::data::fred::{MACRO_SERIES, download_series, macro_series_ids};
use crate::data::{DatedSeries, HttpGet};
use crate::domain::{MonthlyAgg, MonthlyFrame, resample_monthly};
use crate::error::AppError;
use crate::math::{diff, pct_change_n};

/// Covariates that receive lagged copies in the feature frame.
pub const BASE_COVARIATES: [&str; 7] = [
    "inflation_yoy",
    "us10y",
    "us10y_chg",
    "fed_funds_rate",
    "fedfunds_chg",
    "unemployment_rate",
    "unrate_chg",
];

/// Monthly mean of each FRED series plus the derived change columns.
///
/// Series that are absent become all-missing columns, so the frame always
/// has the same shape.
pub fn macro_frame(series: &[DatedSeries]) -> MonthlyFrame {
    let frames: Vec<MonthlyFrame> = MACRO_SERIES
        .iter()
        .filter_map(|(id, name)| {
            let found = series.iter().find(|s| s.key == *id)?;
            Some(MonthlyFrame::from_series(name, &resample_monthly(&found.points, MonthlyAgg::Mean)))
        })
        .collect();
    let mut frame = MonthlyFrame::outer_join(&frames);

    for (id, name) in MACRO_SERIES {
        if !frame.contains(name) {
            warn!(series = id, column = name, "macro series unavailable; column left empty");
            frame.set_numeric(name, vec![f64::NAN; frame.len()]);
        }
    }
    let columns: Vec<&str> = MACRO_SERIES.iter().map(|(_, name)| *name).collect();
    let mut frame = frame.select(&columns);

    let col = |name: &str| frame.numeric(name).map(<[f64]>::to_vec).unwrap_or_default();
    let inflation: Vec<f64> = pct_change_n(&col("cpi_index"), 12).iter().map(|v| v * 100.0).collect();
    let us10y_chg = diff(&col("us10y"));
    let fedfunds_chg = diff(&col("fed_funds_rate"));
    let unrate_chg = diff(&col("unemployment_rate"));

    frame.set_numeric("inflation_yoy", inflation);
    frame.set_numeric("us10y_chg", us10y_chg);
    frame.set_numeric("fedfunds_chg", fedfunds_chg);
    frame.set_numeric("unrate_chg", unrate_chg);
    frame
}

/// Download (cache-first) the macro series and build the monthly frame.
pub fn load_macro_frame(settings: &Settings, http: &dyn HttpGet) -> Result<MonthlyFrame, AppError> {
    let (series, _) = download_series(settings, http, &macro_series_ids())?;
    Ok(macro_frame(&series))
}
