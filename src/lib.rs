//! Sales Forecast: per-item forecast lookup dashboard
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod data;
pub mod engine;
pub mod dashboard;
