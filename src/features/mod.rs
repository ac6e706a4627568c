//! Feature construction for the monthly panel.
//!
//! - return columns and price-column discovery (`returns`)
//! - positional lags and leading-row trim (`lags`)
//! - FRED macro frame with derived changes (`macro_frame`)
//! - benchmark/basket returns and per-ticker feature frames (`builder`)

pub mod builder;
pub mod lags;
pub mod macro_frame;
pub mod returns;

pub use builder::{AI_BASKET_COLUMN, ai_basket_returns, benchmark_returns, build_features, combine_features};
pub use lags::{lag_column, make_lags, trim_leading};
pub use macro_frame::{BASE_COVARIATES, load_macro_frame, macro_frame};
pub use returns::{EnsuredReturns, ensure_returns, find_price_column, is_return_column, return_column};
