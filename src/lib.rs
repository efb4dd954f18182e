//! store-uptime library - store uptime/downtime reporting
//!
//! This module exports internal components for integration testing.

pub mod cli;
pub mod config;
pub mod error;
pub mod hours;
pub mod ingest;
pub mod interpolate;
pub mod model;
pub mod registry;
pub mod report;
pub mod server;
pub mod timezone;
