//! Sequential multi-key download with pacing and a summary.

use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::data::cache::{DatedSeries, Origin, Resolver, SeriesSource};
use crate::error::AppError;

/// Outcome of a batch resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub total: usize,
    pub from_cache: usize,
    pub fetched: usize,
    /// Keys with no data from the cache or any source.
    pub missing: Vec<String>,
}

impl DownloadSummary {
    pub fn all_resolved(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn line(&self) -> String {
        let mut out = format!(
            "{} of {} resolved ({} cached, {} fetched)",
            self.from_cache + self.fetched,
            self.total,
            self.from_cache,
            self.fetched
        );
        if !self.missing.is_empty() {
            out.push_str(&format!(" | missing: {}", self.missing.join(", ")));
        }
        out
    }
}

/// Resolve each key in order. Sleeps `pacing` after every network fetch;
/// cache hits are not paced. Keys without data are skipped with a warning.
pub fn resolve_all(
    resolver: &Resolver<'_>,
    keys: &[String],
    start: NaiveDate,
    end: NaiveDate,
    sources: &[&dyn SeriesSource],
    pacing: Duration,
) -> Result<(Vec<DatedSeries>, DownloadSummary), AppError> {
    let mut summary = DownloadSummary {
        total: keys.len(),
        ..DownloadSummary::default()
    };
    let mut out = Vec::with_capacity(keys.len());

    for key in keys {
        match resolver.resolve(key, start, end, sources)? {
            Some((series, Origin::Cache)) => {
                summary.from_cache += 1;
                out.push(series);
            }
            Some((series, Origin::Source(source))) => {
                info!(key = %key, source = %source, rows = series.len(), "fetched");
                summary.fetched += 1;
                out.push(series);
                thread::sleep(pacing);
            }
            None => {
                warn!(key = %key, "no data from cache or any source; skipping");
                summary.missing.push(key.clone());
                if !sources.is_empty() {
                    thread::sleep(pacing);
                }
            }
        }
    }

    Ok((out, summary))
}
