//! Data acquisition: HTTP with retries, the flat-file cache, and providers.
//!
//! - fetch-with-retry over a swappable transport (`http`)
//! - `date,value` CSV cache + cache-then-network resolver (`cache`)
//! - paced batch resolve with a summary (`download`)
//! - FRED, Polygon, and Yahoo sources (`fred`, `polygon`, `yahoo`)
//! - daily/monthly price loading for the configured provider (`prices`)

pub mod cache;
pub mod download;
pub mod fred;
pub mod http;
pub mod polygon;
pub mod prices;
pub mod yahoo;

pub use cache::{DatedSeries, DiskCache, Origin, Resolver, SeriesSource};
pub use download::{DownloadSummary, resolve_all};
pub use fred::{FredSource, MACRO_SERIES, download_series};
pub use http::{FetchError, HttpGet, HttpResponse, ReqwestTransport, RetryPolicy, get_json};
pub use prices::{PriceLoader, align_daily, monthly_close_frame};
