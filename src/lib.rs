//! `tech-monthly` library crate.
//!
//! The binary (`tm`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - network access sits behind a swappable transport (`data::HttpGet`)
//! - each pipeline step (ingest, features, fit) is usable on its own

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod fit;
pub mod ingest;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
