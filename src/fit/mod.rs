//! Guarded per-ticker regression.
//!
//! Responsibilities:
//!
//! - rank covariates by completeness
//! - drop incomplete rows and enforce sample-size guardrails
//! - fit OLS with an intercept

pub mod regression;

pub use regression::*;
