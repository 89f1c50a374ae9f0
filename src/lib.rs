//! Multi-source housing and macro data reconciliation pipeline.
//!
//! Ingests five public datasets (mortgage rate, CPI, active listings,
//! county population, county home-value index), reconciles them onto a
//! canonical per-county-per-month table, and fits explanatory and
//! forecasting models over the result.

pub mod backbone;
pub mod config;
pub mod constants;
pub mod counties;
pub mod error;
pub mod keys;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod reconcile;
pub mod sources;
pub mod table;

pub use error::{PipelineError, Result};
