//! RNA-Seq count matrix summarizer.
//!
//! An uploaded count matrix (one identifier column, N numeric sample columns)
//! is validated and reduced to per-row Mean / Median / StdDev by a background
//! task. The backend (`rnaseq-backend`) exposes task submission and polling
//! over HTTP; the dashboard (`rnaseq-viz`) uploads, polls and plots.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod server;
pub mod storage;
pub mod tasks;

pub use error::{Error, Result};
